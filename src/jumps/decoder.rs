use crate::error::AnalysisError;
use crate::jumps::event::{JumpEvent, JumpLayout};
use crate::model::{AnnotationValue, Tree, VertexIndex};
use crate::states::StateMerger;

/// Default name of the discrete-state annotation.
pub const DEFAULT_STATE_ATTRIBUTE: &str = "location";
/// Default name of the jump history annotation.
pub const DEFAULT_HISTORY_ATTRIBUTE: &str = "history";

// ============================================================================
// Decoding (pub)
// ============================================================================
/// Decodes the jumps recorded on the branch above `vertex`.
///
/// Jumps are returned in recorded order, which is root-to-tip (oldest first).
/// No semantic checks are made; only the shape of each tuple is validated.
///
/// # Returns
/// `Ok(None)` if `vertex` carries no `attribute`, i.e. nothing happened on its branch.
///
/// # Errors
/// Returns [AnalysisError::MalformedJump] if the annotation is not an array
/// of tuples matching `layout`.
pub fn decode(
    tree: &Tree,
    vertex: VertexIndex,
    attribute: &str,
    layout: JumpLayout,
) -> Result<Option<Vec<JumpEvent>>, AnalysisError> {
    let Some(value) = tree.annotation(attribute, vertex) else {
        return Ok(None);
    };
    let malformed = |reason: String| AnalysisError::MalformedJump {
        tree_id: tree.id().to_string(),
        vertex,
        attribute: attribute.to_string(),
        reason,
    };

    let tuples = value
        .as_array()
        .ok_or_else(|| malformed(format!("expected an array of jumps, found '{value}'")))?;

    let mut events = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let fields = tuple
            .as_array()
            .ok_or_else(|| malformed(format!("expected a jump tuple, found '{tuple}'")))?;
        events.push(decode_tuple(fields, layout).map_err(&malformed)?);
    }
    Ok(Some(events))
}

fn decode_tuple(fields: &[AnnotationValue], layout: JumpLayout) -> Result<JumpEvent, String> {
    match (layout, fields) {
        (JumpLayout::Standard, [time, from, to]) => {
            Ok(JumpEvent::new(number(time)?, label(from)?, label(to)?))
        }
        (JumpLayout::Standard, [time, from, to, current]) => {
            Ok(JumpEvent::new(number(time)?, label(from)?, label(to)?).with_current(label(current)?))
        }
        (JumpLayout::SiteFirst, [site, time, from, to]) => {
            let site = site
                .as_i64()
                .and_then(|s| u32::try_from(s).ok())
                .ok_or_else(|| format!("site '{site}' is not a non-negative integer"))?;
            Ok(JumpEvent::new(number(time)?, label(from)?, label(to)?).with_site(site))
        }
        (JumpLayout::Standard, _) => Err(format!(
            "jump tuple has {} fields, expected 3 or 4",
            fields.len()
        )),
        (JumpLayout::SiteFirst, _) => Err(format!(
            "site jump tuple has {} fields, expected 4",
            fields.len()
        )),
    }
}

fn number(value: &AnnotationValue) -> Result<f64, String> {
    value
        .as_f64()
        .filter(|t| t.is_finite())
        .ok_or_else(|| format!("time '{value}' is not a number"))
}

fn label(value: &AnnotationValue) -> Result<String, String> {
    value
        .as_label()
        .ok_or_else(|| format!("state '{value}' is not a label"))
}

// =#========================================================================#=
// JUMP HISTORY DECODER
// =#========================================================================#=
/// Reads discrete states and jump histories of vertices, with optional
/// state merging applied to both.
///
/// # Example
/// ```
/// use jumphistory::jumps::JumpHistoryDecoder;
/// use jumphistory::newick::parse_str;
///
/// let tree = parse_str("(A[&location=X,history={{0.5,Y,X}}]:1,B[&location=Y]:1)[&location=Y];").unwrap();
/// let decoder = JumpHistoryDecoder::new();
/// let a = tree.leaf_by_label("A").unwrap();
/// assert_eq!(decoder.state(&tree, a).unwrap(), "X");
/// assert_eq!(decoder.decode_merged(&tree, a).unwrap().unwrap()[0].from, "Y");
/// ```
#[derive(Debug, Clone)]
pub struct JumpHistoryDecoder {
    state_attribute: String,
    history_attribute: String,
    layout: JumpLayout,
    merger: Option<StateMerger>,
}

impl Default for JumpHistoryDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JumpHistoryDecoder {
    /// Creates a decoder for `location` states and `history` jumps.
    pub fn new() -> Self {
        JumpHistoryDecoder {
            state_attribute: DEFAULT_STATE_ATTRIBUTE.to_string(),
            history_attribute: DEFAULT_HISTORY_ATTRIBUTE.to_string(),
            layout: JumpLayout::Standard,
            merger: None,
        }
    }

    pub fn with_state_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.state_attribute = attribute.into();
        self
    }

    pub fn with_history_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.history_attribute = attribute.into();
        self
    }

    pub fn with_layout(mut self, layout: JumpLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Maps every state read through this decoder with `merger`.
    pub fn with_merger(mut self, merger: StateMerger) -> Self {
        self.merger = Some(merger);
        self
    }

    pub fn state_attribute(&self) -> &str {
        &self.state_attribute
    }

    pub fn history_attribute(&self) -> &str {
        &self.history_attribute
    }

    pub fn layout(&self) -> JumpLayout {
        self.layout
    }

    /// Returns the (merged) discrete state of `vertex`, if annotated.
    pub fn try_state(&self, tree: &Tree, vertex: VertexIndex) -> Option<String> {
        let raw = tree.annotation(&self.state_attribute, vertex)?.as_label()?;
        Some(self.merge(raw))
    }

    /// Returns the (merged) discrete state of `vertex`.
    ///
    /// # Errors
    /// Returns [AnalysisError::MissingAnnotation] if the state is absent.
    pub fn state(&self, tree: &Tree, vertex: VertexIndex) -> Result<String, AnalysisError> {
        self.try_state(tree, vertex)
            .ok_or_else(|| AnalysisError::MissingAnnotation {
                tree_id: tree.id().to_string(),
                vertex,
                attribute: self.state_attribute.clone(),
            })
    }

    /// Decodes the branch above `vertex` and merges the states of every jump.
    ///
    /// # Errors
    /// See [decode].
    pub fn decode_merged(
        &self,
        tree: &Tree,
        vertex: VertexIndex,
    ) -> Result<Option<Vec<JumpEvent>>, AnalysisError> {
        let events = decode(tree, vertex, &self.history_attribute, self.layout)?;
        Ok(match &self.merger {
            None => events,
            Some(merger) => events.map(|events| {
                events
                    .into_iter()
                    .map(|mut event| {
                        event.from = merger.merge(&event.from);
                        event.to = merger.merge(&event.to);
                        event.current = event.current.map(|c| merger.merge(&c));
                        event
                    })
                    .collect()
            }),
        })
    }

    fn merge(&self, raw: String) -> String {
        match &self.merger {
            Some(merger) => merger.merge(&raw),
            None => raw,
        }
    }
}
