use crate::error::AnalysisError;
use crate::jumps::{JumpEvent, JumpHistoryDecoder};
use crate::model::{Tree, VertexIndex};
use std::collections::BTreeMap;
use std::fmt;

const DELIMITER: &str = "\t";

/// States compare case-insensitively throughout the census.
fn same_state(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

// ============================================================================
// Chain Row (pub)
// ============================================================================
/// One introduction of a chain state and the transmission chain it seeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRow {
    pub tree_id: String,
    /// Parent of the introduced vertex, `None` at the root
    pub start_vertex: Option<VertexIndex>,
    pub end_vertex: VertexIndex,
    /// State before the introduction, `None` at the root
    pub source_state: Option<String>,
    pub current_state: String,
    /// Height of the introducing jump, or of the parent without jumps
    pub introduction_time: f64,
    pub num_descendants: usize,
    pub num_same_state_descendants: usize,
    pub num_persistent_descendants: usize,
    pub chain_length: f64,
    pub root_height: f64,
    pub is_external: bool,
    /// Number of jumps out of the chain per destination state
    pub divergences: BTreeMap<String, usize>,
}

impl ChainRow {
    pub const HEADER: &'static str = "treeId\tstartNodeID\tendNodeID\tsourceLocation\tcurrentLocation\t\
        introductionTime\tnumberOfDescendants\tnumberOfDescendantsOfSameState\t\
        numberOfPersistentDescendantsOfSameState\tlengthOfTransmissionChain\trootHeight\t\
        isExternal\tpersistentDescendantStateCounts";
}

impl fmt::Display for ChainRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self
            .start_vertex
            .map_or_else(|| "-1".to_string(), |v| v.to_string());
        let divergences = serde_json::to_string(&self.divergences).map_err(|_| fmt::Error)?;
        let fields = [
            self.tree_id.clone(),
            start,
            self.end_vertex.to_string(),
            self.source_state.clone().unwrap_or_else(|| "NA".to_string()),
            self.current_state.clone(),
            self.introduction_time.to_string(),
            self.num_descendants.to_string(),
            self.num_same_state_descendants.to_string(),
            self.num_persistent_descendants.to_string(),
            self.chain_length.to_string(),
            self.root_height.to_string(),
            self.is_external.to_string(),
            divergences,
        ];
        f.write_str(&fields.join(DELIMITER))
    }
}

// =#========================================================================#=
// PERSISTENCE CHAIN AGGREGATOR
// =#========================================================================#=
/// Census of transmission chains: for every vertex in one of the chain
/// states whose parent is in another state, counts the descendants that
/// persist in the chain state and the jumps leaving the chain.
///
/// Jumps are read as logged by the sampler, `from` being the ancestral state:
/// the most recent jump on a branch introduces its `to` state.
///
/// A time slice (as a height) restricts the census to vertices, leaves and
/// branches at or above it; the chain then ends at the slice at the latest.
#[derive(Debug, Clone)]
pub struct PersistenceChainAggregator {
    decoder: JumpHistoryDecoder,
    states: Vec<String>,
    time_slice: Option<f64>,
}

/// Result of following one chain down the tree.
struct ChainCensus {
    persistent: Vec<VertexIndex>,
    divergences: BTreeMap<String, usize>,
    min_height: f64,
}

impl PersistenceChainAggregator {
    /// Creates an aggregator for chains in any of `states` (after merging).
    pub fn new(decoder: JumpHistoryDecoder, states: Vec<String>) -> Self {
        PersistenceChainAggregator {
            decoder,
            states,
            time_slice: None,
        }
    }

    /// Only looks at what lies at or above `height`.
    pub fn with_time_slice(mut self, height: f64) -> Self {
        self.time_slice = Some(height);
        self
    }

    fn above_slice(&self, height: f64) -> bool {
        self.time_slice.is_none_or(|slice| height >= slice)
    }

    /// Returns one row per chain introduction in `tree`, by vertex index.
    ///
    /// # Errors
    /// * [AnalysisError::MissingAnnotation] if a vertex visited lacks a state
    /// * [AnalysisError::MalformedJump] if a history cannot be decoded
    /// * [AnalysisError::StateMismatch] if a jump leaving the chain does not
    ///   start in the chain state
    pub fn process_tree(&self, tree: &Tree) -> Result<Vec<ChainRow>, AnalysisError> {
        let mut rows = Vec::new();
        for vertex in 0..tree.num_vertices() {
            if let Some(row) = self.introduction(tree, vertex)? {
                rows.push(row);
            }
        }
        log::debug!("Tree {}: {} chain introductions", tree.id(), rows.len());
        Ok(rows)
    }

    fn introduction(&self, tree: &Tree, vertex: VertexIndex) -> Result<Option<ChainRow>, AnalysisError> {
        let height = tree.height(vertex);
        let state = self.decoder.state(tree, vertex)?;
        if !self.states.contains(&state) || !self.above_slice(height) {
            return Ok(None);
        }

        let parent = tree.parent(vertex);
        let parent_state = parent.map(|p| self.decoder.state(tree, p)).transpose()?;
        if parent_state.as_deref().is_some_and(|p| same_state(p, &state)) {
            return Ok(None);
        }

        let (source_state, current_state, introduction_time) =
            match most_recent(self.decoder.decode_merged(tree, vertex)?) {
                Some(jump) => (Some(jump.from), jump.to, jump.time),
                None => (
                    parent_state,
                    state.clone(),
                    tree.height(parent.unwrap_or(vertex)),
                ),
            };

        let descendants: Vec<VertexIndex> = tree
            .leaves_below(vertex)
            .into_iter()
            .filter(|&leaf| self.above_slice(tree.height(leaf)))
            .collect();
        let mut num_same_state = 0;
        for &leaf in &descendants {
            if same_state(&self.decoder.state(tree, leaf)?, &current_state) {
                num_same_state += 1;
            }
        }

        let census = self.follow_chain(tree, vertex, &state)?;
        let root_height = tree.root_height();
        let chain_length = if root_height > 0.0 {
            (height - census.min_height) / root_height
        } else {
            0.0
        };

        Ok(Some(ChainRow {
            tree_id: tree.id().to_string(),
            start_vertex: parent,
            end_vertex: vertex,
            source_state,
            current_state,
            introduction_time,
            num_descendants: descendants.len(),
            num_same_state_descendants: num_same_state,
            num_persistent_descendants: census.persistent.len(),
            chain_length,
            root_height,
            is_external: tree.is_leaf(vertex),
            divergences: census.divergences,
        }))
    }

    /// Follows the chain below `vertex` while vertices stay in `chain_state`.
    fn follow_chain(
        &self,
        tree: &Tree,
        vertex: VertexIndex,
        chain_state: &str,
    ) -> Result<ChainCensus, AnalysisError> {
        let mut census = ChainCensus {
            persistent: Vec::new(),
            divergences: BTreeMap::new(),
            min_height: tree.height(vertex),
        };
        let mut stack = vec![vertex];

        while let Some(current) = stack.pop() {
            let Some((left, right)) = tree.children(current) else {
                continue;
            };
            for child in [right, left] {
                let child_height = tree.height(child);
                if let Some(slice) = self.time_slice
                    && child_height < slice
                {
                    census.min_height = census.min_height.min(slice);
                    continue;
                }

                let child_state = self.decoder.state(tree, child)?;
                let stays_in_chain = same_state(&child_state, chain_state);
                match earliest(self.decoder.decode_merged(tree, child)?) {
                    Some(jump) if !same_state(&jump.from, chain_state) => {
                        return Err(AnalysisError::StateMismatch {
                            tree_id: tree.id().to_string(),
                            vertex: child,
                            expected: chain_state.to_string(),
                            found: jump.from,
                        });
                    }
                    // A round trip back into the chain state still ends the chain
                    Some(jump) => {
                        let diverged_to = if stays_in_chain { jump.to } else { child_state };
                        *census.divergences.entry(diverged_to).or_insert(0) += 1;
                        census.min_height = census.min_height.min(jump.time);
                    }
                    None if stays_in_chain => {
                        if tree.is_leaf(child) {
                            census.persistent.push(child);
                            census.min_height = census.min_height.min(child_height);
                        } else {
                            stack.push(child);
                        }
                    }
                    None => {
                        *census.divergences.entry(child_state).or_insert(0) += 1;
                        census.min_height = census.min_height.min(child_height);
                    }
                }
            }
        }
        Ok(census)
    }
}

fn most_recent(jumps: Option<Vec<JumpEvent>>) -> Option<JumpEvent> {
    jumps?.into_iter().min_by(|a, b| a.time.total_cmp(&b.time))
}

fn earliest(jumps: Option<Vec<JumpEvent>>) -> Option<JumpEvent> {
    jumps?.into_iter().max_by(|a, b| a.time.total_cmp(&b.time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_str;

    // Heights: root 10, X 6, Y 3, leaves 0.
    //
    //              root (Fujian)
    //             /            \
    //        X (Hubei)        D (Fujian)
    //        /       \
    //   Y (Hubei)   C (Anhui, jump Hubei->Anhui at 2)
    //    /     \
    //  A(Hubei) B(Hubei)
    const TREE: &str = "(((A[&location=Hubei]:3,B[&location=hubei]:3)[&location=Hubei]:3,\
        C[&location=Anhui,history={{2.0,Hubei,Anhui}}]:6)\
        [&location=Hubei,history={{8.0,Fujian,Hubei}}]:4,D[&location=Fujian]:10)[&location=Fujian];";

    fn aggregator(states: &[&str]) -> PersistenceChainAggregator {
        PersistenceChainAggregator::new(
            JumpHistoryDecoder::new(),
            states.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_census_of_single_introduction() {
        let tree = parse_str(TREE).unwrap();
        let rows = aggregator(&["Hubei"]).process_tree(&tree).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.start_vertex, Some(tree.root_index()));
        assert_eq!(row.source_state.as_deref(), Some("Fujian"));
        assert_eq!(row.current_state, "Hubei");
        assert_eq!(row.introduction_time, 8.0);
        assert_eq!(row.num_descendants, 3);
        assert_eq!(row.num_same_state_descendants, 2);
        assert_eq!(row.num_persistent_descendants, 2);
        assert_eq!(row.divergences, BTreeMap::from([("Anhui".to_string(), 1)]));
        assert_eq!(row.chain_length, 0.6);
        assert!(!row.is_external);
    }

    #[test]
    fn test_time_slice_cuts_chain() {
        let tree = parse_str(TREE).unwrap();
        let rows = aggregator(&["Hubei"]).with_time_slice(4.0).process_tree(&tree).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].num_descendants, 0);
        assert_eq!(rows[0].num_persistent_descendants, 0);
        assert_eq!(rows[0].chain_length, 0.2);
    }

    #[test]
    fn test_root_introduction_and_row_format() {
        let tree = parse_str(TREE).unwrap();
        let rows = aggregator(&["Fujian"]).process_tree(&tree).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.start_vertex, None);
        assert_eq!(row.introduction_time, 10.0);
        assert_eq!(row.divergences, BTreeMap::from([("Hubei".to_string(), 1)]));

        let line = row.to_string();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), ChainRow::HEADER.split('\t').count());
        assert_eq!(fields[1], "-1");
        assert_eq!(fields[3], "NA");
        assert_eq!(fields[12], "{\"Hubei\":1}");
    }

    #[test]
    fn test_round_trip_on_branch_ends_chain() {
        let tree = parse_str(&TREE.replace(
            "A[&location=Hubei]",
            "A[&location=Hubei,history={{1.5,Hubei,Anhui},{0.5,Anhui,Hubei}}]",
        ))
        .unwrap();
        let rows = aggregator(&["Hubei"]).process_tree(&tree).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.num_same_state_descendants, 2);
        assert_eq!(row.num_persistent_descendants, 1);
        assert_eq!(row.divergences, BTreeMap::from([("Anhui".to_string(), 2)]));
        assert_eq!(row.chain_length, 0.6);
    }

    #[test]
    fn test_leaving_jump_must_start_in_chain_state() {
        let tree = parse_str(
            "((A[&location=Hubei]:1,B[&location=Anhui,history={{0.5,Fujian,Anhui}}]:1)[&location=Hubei]:1,\
             C[&location=Fujian]:2)[&location=Fujian];",
        )
        .unwrap();
        assert!(matches!(
            aggregator(&["Hubei"]).process_tree(&tree),
            Err(AnalysisError::StateMismatch { .. })
        ));
    }
}
