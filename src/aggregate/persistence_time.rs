use crate::error::AnalysisError;
use crate::jumps::{JumpEvent, JumpHistoryDecoder};
use crate::model::{Tree, VertexIndex};
use crate::walker::TimeScale;
use std::fmt;

const DELIMITER: &str = ",";

fn same_state(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

// ============================================================================
// Evaluation Point (pub)
// ============================================================================
/// A time at which lineages are evaluated, with an optional limit on how
/// far back persistence is traced. Both are in the aggregator's time scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationPoint {
    pub time: f64,
    pub ancestral_time: Option<f64>,
}

impl EvaluationPoint {
    pub fn new(time: f64) -> Self {
        EvaluationPoint {
            time,
            ancestral_time: None,
        }
    }

    pub fn with_ancestral_time(mut self, ancestral_time: f64) -> Self {
        self.ancestral_time = Some(ancestral_time);
        self
    }
}

// ============================================================================
// Persistence Row (pub)
// ============================================================================
/// One branch crossing an evaluation time.
///
/// The "event" vertex is the one directly below the jump that introduced
/// the state at the evaluation time, or where tracing stopped (root or
/// ancestral time).
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceRow {
    pub tree_id: String,
    pub evaluation_time: f64,
    pub ancestral_time: Option<f64>,
    /// Vertex below the crossing branch
    pub evaluation_vertex: VertexIndex,
    pub event_vertex: VertexIndex,
    pub state: String,
    /// State before the introducing jump, or at the event vertex without one
    pub ancestral_state: String,
    /// Time spent in `state` before the evaluation time
    pub persistence_time: f64,
    /// Time back to the closest common ancestor shared with another crossing
    /// lineage that kept the same state all the way
    pub independence_time: f64,
    pub num_descendants: usize,
    pub num_same_state_descendants: usize,
    pub num_event_descendants: usize,
    pub num_same_state_event_descendants: usize,
    pub num_event_descendants_after: usize,
    pub num_same_state_event_descendants_after: usize,
}

impl PersistenceRow {
    pub const HEADER: &'static str = "treeId,evaluationTime,ancestralTime,evaluationNodeID,ancestralNodeID,\
        stateAtEvaluationTime,ancestralState,persistenceTime,independenceTime,descendants,\
        descendantsOfSameState,totalDescendantsFromUnique,totalDescendantsFromUniqueOfSameState,\
        descendantsFromUniqueAfterEvalTime,descendantsFromUniqueOfSameStateAfterEvalTime";
}

impl fmt::Display for PersistenceRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            self.tree_id.clone(),
            self.evaluation_time.to_string(),
            self.ancestral_time.map_or_else(|| "NA".to_string(), |t| t.to_string()),
            self.evaluation_vertex.to_string(),
            self.event_vertex.to_string(),
            self.state.clone(),
            self.ancestral_state.clone(),
            self.persistence_time.to_string(),
            self.independence_time.to_string(),
            self.num_descendants.to_string(),
            self.num_same_state_descendants.to_string(),
            self.num_event_descendants.to_string(),
            self.num_same_state_event_descendants.to_string(),
            self.num_event_descendants_after.to_string(),
            self.num_same_state_event_descendants_after.to_string(),
        ];
        f.write_str(&fields.join(DELIMITER))
    }
}

// =#========================================================================#=
// PERSISTENCE TIME AGGREGATOR
// =#========================================================================#=
/// State persistence of the lineages alive at given evaluation times.
///
/// For every branch crossing an evaluation time, traces the state it is in
/// at that time back to the jump that introduced it. A jump at exactly the
/// evaluation time counts as before it.
#[derive(Debug, Clone)]
pub struct PersistenceTimeAggregator {
    decoder: JumpHistoryDecoder,
    points: Vec<EvaluationPoint>,
    time_scale: TimeScale,
}

/// A branch crossing an evaluation height.
struct Crossing {
    vertex: VertexIndex,
    state: String,
    /// Height of the highest ancestor still reached in `state`
    maintained_to: Option<f64>,
}

/// Where tracing a state back ended.
struct Introduction {
    vertex: VertexIndex,
    ancestral_state: String,
    height: f64,
}

impl PersistenceTimeAggregator {
    pub fn new(decoder: JumpHistoryDecoder, points: Vec<EvaluationPoint>) -> Self {
        PersistenceTimeAggregator {
            decoder,
            points,
            time_scale: TimeScale::heights(),
        }
    }

    /// Reads evaluation and ancestral times in `time_scale`.
    pub fn with_time_scale(mut self, time_scale: TimeScale) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Returns the rows of every evaluation point for `tree`, points in
    /// order and crossings by vertex index.
    ///
    /// # Errors
    /// * [AnalysisError::MissingAnnotation] if a vertex visited lacks a state
    /// * [AnalysisError::MalformedJump] if a history cannot be decoded
    pub fn process_tree(&self, tree: &Tree) -> Result<Vec<PersistenceRow>, AnalysisError> {
        let mut rows = Vec::new();
        for point in &self.points {
            rows.extend(self.evaluate(tree, point)?);
        }
        Ok(rows)
    }

    fn evaluate(&self, tree: &Tree, point: &EvaluationPoint) -> Result<Vec<PersistenceRow>, AnalysisError> {
        let height = self.time_scale.to_height(point.time);
        let limit = point.ancestral_time.map(|t| self.time_scale.to_height(t));

        let mut crossings = Vec::new();
        for vertex in 0..tree.num_vertices() {
            let Some(parent) = tree.parent(vertex) else {
                continue;
            };
            if tree.height(vertex) <= height && height < tree.height(parent) {
                crossings.push(self.crossing(tree, vertex, height)?);
            }
        }
        log::debug!(
            "Tree {}: {} lineages cross time {}",
            tree.id(),
            crossings.len(),
            point.time
        );

        let mut rows = Vec::with_capacity(crossings.len());
        for crossing in &crossings {
            let introduction = self.introduction(tree, crossing, height, limit)?;
            let independence_time = independence(tree, crossing, &crossings) - height;

            let descendants = tree.leaves_below(crossing.vertex);
            let event_descendants = tree.leaves_below(introduction.vertex);
            let event_after: Vec<VertexIndex> = event_descendants
                .iter()
                .copied()
                .filter(|&leaf| tree.height(leaf) < height)
                .collect();

            rows.push(PersistenceRow {
                tree_id: tree.id().to_string(),
                evaluation_time: point.time,
                ancestral_time: point.ancestral_time,
                evaluation_vertex: crossing.vertex,
                event_vertex: introduction.vertex,
                state: crossing.state.clone(),
                ancestral_state: introduction.ancestral_state,
                persistence_time: introduction.height - height,
                independence_time,
                num_descendants: descendants.len(),
                num_same_state_descendants: self.count_in_state(tree, &descendants, &crossing.state)?,
                num_event_descendants: event_descendants.len(),
                num_same_state_event_descendants: self.count_in_state(
                    tree,
                    &event_descendants,
                    &crossing.state,
                )?,
                num_event_descendants_after: event_after.len(),
                num_same_state_event_descendants_after: self.count_in_state(
                    tree,
                    &event_after,
                    &crossing.state,
                )?,
            });
        }
        Ok(rows)
    }

    /// The state of the branch above `vertex` at `height`, and how far up
    /// the tree that state is kept without any jump.
    fn crossing(&self, tree: &Tree, vertex: VertexIndex, height: f64) -> Result<Crossing, AnalysisError> {
        let jumps = self.jumps(tree, vertex)?;
        // The oldest jump below the evaluation time leaves the state it had then
        let state = match jumps
            .iter()
            .filter(|jump| jump.time < height)
            .max_by(|a, b| a.time.total_cmp(&b.time))
        {
            Some(jump) => jump.from.clone(),
            None => self.decoder.state(tree, vertex)?,
        };

        let mut maintained_to = None;
        if !jumps.iter().any(|jump| jump.time >= height) {
            let mut current = vertex;
            while let Some(parent) = tree.parent(current) {
                if !same_state(&self.decoder.state(tree, parent)?, &state) {
                    break;
                }
                maintained_to = Some(tree.height(parent));
                if tree.is_root(parent) || !self.jumps(tree, parent)?.is_empty() {
                    break;
                }
                current = parent;
            }
        }

        Ok(Crossing {
            vertex,
            state,
            maintained_to,
        })
    }

    /// Traces the state of `crossing` back to the most recent jump above
    /// the evaluation height, stopping at the root or at `limit`.
    fn introduction(
        &self,
        tree: &Tree,
        crossing: &Crossing,
        height: f64,
        limit: Option<f64>,
    ) -> Result<Introduction, AnalysisError> {
        let jumps = self.jumps(tree, crossing.vertex)?;
        if let Some(jump) = most_recent(jumps.into_iter().filter(|jump| jump.time >= height)) {
            return Ok(Introduction {
                vertex: crossing.vertex,
                ancestral_state: jump.from,
                height: jump.time,
            });
        }

        let mut current = crossing.vertex;
        while let Some(parent) = tree.parent(current) {
            current = parent;
            let reached = tree.height(current);
            if tree.is_root(current) || limit.is_some_and(|limit| reached >= limit) {
                break;
            }
            if let Some(jump) = most_recent(self.jumps(tree, current)?.into_iter()) {
                return Ok(Introduction {
                    vertex: current,
                    ancestral_state: jump.from,
                    height: jump.time,
                });
            }
        }
        Ok(Introduction {
            vertex: current,
            ancestral_state: self.decoder.state(tree, current)?,
            height: tree.height(current),
        })
    }

    fn jumps(&self, tree: &Tree, vertex: VertexIndex) -> Result<Vec<JumpEvent>, AnalysisError> {
        Ok(self.decoder.decode_merged(tree, vertex)?.unwrap_or_default())
    }

    fn count_in_state(&self, tree: &Tree, leaves: &[VertexIndex], state: &str) -> Result<usize, AnalysisError> {
        let mut count = 0;
        for &leaf in leaves {
            if same_state(&self.decoder.state(tree, leaf)?, state) {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Height of the lowest common ancestor that `crossing` shares with another
/// crossing in the same state, both having kept it up to there; the root
/// height if there is none.
fn independence(tree: &Tree, crossing: &Crossing, crossings: &[Crossing]) -> f64 {
    let Some(reach) = crossing.maintained_to else {
        return tree.root_height();
    };
    crossings
        .iter()
        .filter(|other| other.vertex != crossing.vertex && same_state(&other.state, &crossing.state))
        .filter_map(|other| {
            let other_reach = other.maintained_to?;
            let mrca = tree.mrca(&[crossing.vertex, other.vertex])?;
            let mrca_height = tree.height(mrca);
            (mrca_height <= reach && mrca_height <= other_reach).then_some(mrca_height)
        })
        .fold(tree.root_height(), f64::min)
}

fn most_recent(jumps: impl Iterator<Item = JumpEvent>) -> Option<JumpEvent> {
    jumps.min_by(|a, b| a.time.total_cmp(&b.time))
}
