use crate::error::AnalysisError;
use crate::jumps::JumpHistoryDecoder;
use crate::model::{EPSILON, Tree, VertexIndex};
use crate::walker::path::{LineagePath, StateInterval, StopReason, Transition};
use crate::walker::time::TimeScale;

/// Where a walk ends besides the root, which always ends it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopCondition {
    /// Stop at the first vertex reached in this state
    pub end_state: Option<String>,
    /// Stop at the first vertex dated at or before this calendar time
    pub end_time: Option<f64>,
    /// Stop at this ancestor
    pub stop_vertex: Option<VertexIndex>,
}

impl StopCondition {
    /// Walks all the way to the root.
    pub fn at_root() -> Self {
        Self::default()
    }

    pub fn with_end_state(mut self, state: impl Into<String>) -> Self {
        self.end_state = Some(state.into());
        self
    }

    pub fn with_end_time(mut self, time: f64) -> Self {
        self.end_time = Some(time);
        self
    }

    pub fn with_stop_vertex(mut self, vertex: VertexIndex) -> Self {
        self.stop_vertex = Some(vertex);
        self
    }
}

enum WalkState {
    /// Positioned at `vertex`, in `state` since `height`
    Walking {
        vertex: VertexIndex,
        state: String,
        height: f64,
    },
    Done {
        vertex: VertexIndex,
        reason: StopReason,
    },
}

// =#========================================================================#=
// LINEAGE WALKER
// =#========================================================================#=
/// Reconstructs the state history of a lineage from a start vertex rootwards.
///
/// The walk starts in the annotated state of the start vertex. On every
/// branch it passes, the jumps are replayed tip to root (reverse of the
/// recorded order), each checked to leave the state the lineage is in and
/// to lie on the branch after the previous jump. A jump's `from` is thus the
/// state below it and `to` the state above it. The walk stops at the
/// first vertex (the start vertex included) matching the [StopCondition],
/// checked in the order stop vertex, end state, end time, root.
///
/// # Example
/// ```
/// use jumphistory::jumps::JumpHistoryDecoder;
/// use jumphistory::newick::parse_str;
/// use jumphistory::walker::{LineageWalker, StopCondition, TimeScale};
///
/// let tree = parse_str("(T[&location=A,history={{2.5,A,B}}]:5,U[&location=B]:5)[&location=B];").unwrap();
/// let walker = LineageWalker::new(JumpHistoryDecoder::new(), StopCondition::at_root(), TimeScale::heights());
/// let path = walker.walk(&tree, tree.leaf_by_label("T").unwrap()).unwrap();
/// let rows: Vec<_> = path.intervals.iter().map(|i| (i.state.as_str(), i.start, i.end)).collect();
/// assert_eq!(rows, vec![("A", 0.0, 2.5), ("B", 2.5, 5.0)]);
/// ```
#[derive(Debug, Clone)]
pub struct LineageWalker {
    decoder: JumpHistoryDecoder,
    stop: StopCondition,
    time_scale: TimeScale,
}

impl LineageWalker {
    /// Creates a walker.
    ///
    /// An end time needs calendar dates; without them it is dropped with a
    /// warning and walks continue to the root.
    pub fn new(decoder: JumpHistoryDecoder, mut stop: StopCondition, time_scale: TimeScale) -> Self {
        if stop.end_time.is_some() && !time_scale.is_calendar() {
            log::warn!("End time is ignored since no most recent sampling date is set");
            stop.end_time = None;
        }
        LineageWalker {
            decoder,
            stop,
            time_scale,
        }
    }

    pub fn decoder(&self) -> &JumpHistoryDecoder {
        &self.decoder
    }

    pub fn stop_condition(&self) -> &StopCondition {
        &self.stop
    }

    pub fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    /// Walks from `start` until the stop condition holds.
    ///
    /// # Errors
    /// * [AnalysisError::MissingAnnotation] if `start` has no state
    /// * [AnalysisError::MalformedJump] if a history on the way cannot be decoded
    /// * [AnalysisError::StateMismatch] if a jump does not leave the current state
    /// * [AnalysisError::JumpOutOfOrder] if a jump lies off its branch or
    ///   before the previous one
    ///
    /// No path is returned in any of these cases.
    pub fn walk(&self, tree: &Tree, start: VertexIndex) -> Result<LineagePath, AnalysisError> {
        self.walk_with(tree, start, self.stop.stop_vertex)
    }

    /// Walks from `start` up to `ancestor` at the latest, e.g. the MRCA of a clade.
    ///
    /// # Errors
    /// See [walk](Self::walk).
    pub fn walk_to(
        &self,
        tree: &Tree,
        start: VertexIndex,
        ancestor: VertexIndex,
    ) -> Result<LineagePath, AnalysisError> {
        self.walk_with(tree, start, Some(ancestor))
    }

    fn walk_with(
        &self,
        tree: &Tree,
        start: VertexIndex,
        stop_vertex: Option<VertexIndex>,
    ) -> Result<LineagePath, AnalysisError> {
        let start_height = tree.height(start);
        let mut intervals = Vec::new();
        let mut transitions = Vec::new();
        let mut walk = WalkState::Walking {
            vertex: start,
            state: self.decoder.state(tree, start)?,
            height: start_height,
        };

        let (stop, stop_reason) = loop {
            walk = match walk {
                WalkState::Done { vertex, reason } => break (vertex, reason),
                WalkState::Walking {
                    vertex,
                    state,
                    height,
                } => match self.check_stop(tree, vertex, &state, stop_vertex) {
                    Some(reason) => {
                        intervals.push(self.interval(state, height, tree.height(vertex)));
                        WalkState::Done { vertex, reason }
                    }
                    None => self.climb(tree, vertex, state, height, &mut intervals, &mut transitions)?,
                },
            };
        };

        Ok(LineagePath {
            start,
            stop,
            stop_reason,
            start_time: self.time_scale.adjust(start_height),
            stop_time: self.time_scale.adjust(tree.height(stop)),
            intervals,
            transitions,
            time_scale: self.time_scale,
        })
    }

    fn check_stop(
        &self,
        tree: &Tree,
        vertex: VertexIndex,
        state: &str,
        stop_vertex: Option<VertexIndex>,
    ) -> Option<StopReason> {
        if stop_vertex == Some(vertex) {
            return Some(StopReason::StopVertex);
        }
        if self.stop.end_state.as_deref() == Some(state) {
            return Some(StopReason::EndState);
        }
        if let Some(end_time) = self.stop.end_time
            && self.time_scale.adjust(tree.height(vertex)) <= end_time
        {
            return Some(StopReason::EndTime);
        }
        if tree.is_root(vertex) {
            return Some(StopReason::Root);
        }
        None
    }

    /// Replays the jumps on the branch above `vertex` and moves to its parent.
    fn climb(
        &self,
        tree: &Tree,
        vertex: VertexIndex,
        mut state: String,
        mut height: f64,
        intervals: &mut Vec<StateInterval>,
        transitions: &mut Vec<Transition>,
    ) -> Result<WalkState, AnalysisError> {
        let parent = tree.parent(vertex).unwrap_or(vertex);
        let parent_height = tree.height(parent);

        let events = self.decoder.decode_merged(tree, vertex)?.unwrap_or_default();
        for event in events.into_iter().rev() {
            if event.from != state {
                return Err(AnalysisError::StateMismatch {
                    tree_id: tree.id().to_string(),
                    vertex,
                    expected: state,
                    found: event.from,
                });
            }
            if let Some(current) = &event.current
                && *current != event.to
            {
                return Err(AnalysisError::StateMismatch {
                    tree_id: tree.id().to_string(),
                    vertex,
                    expected: event.to,
                    found: current.clone(),
                });
            }
            if event.time < height - EPSILON || event.time > parent_height + EPSILON {
                return Err(AnalysisError::JumpOutOfOrder {
                    tree_id: tree.id().to_string(),
                    vertex,
                    height: event.time,
                    lower: height,
                    upper: parent_height,
                });
            }

            let time = self.time_scale.adjust(event.time);
            intervals.push(self.interval(state, height, event.time));
            transitions.push(Transition {
                time,
                from: event.from,
                to: event.to.clone(),
                branch: vertex,
            });
            state = event.to;
            height = event.time;
        }

        Ok(WalkState::Walking {
            vertex: parent,
            state,
            height,
        })
    }

    fn interval(&self, state: String, from_height: f64, to_height: f64) -> StateInterval {
        StateInterval {
            state,
            start: self.time_scale.adjust(from_height),
            end: self.time_scale.adjust(to_height),
        }
    }
}
