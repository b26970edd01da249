//! Errors raised while reconstructing and aggregating jump histories.

use crate::model::VertexIndex;
use crate::nexus::Burnin;
use crate::parser::ParsingError;

/// Error of the analysis layer, from reading trees to aggregating lineages.
///
/// Malformed tree files surface as [Import](Self::Import); everything else
/// concerns the annotations of otherwise well-formed trees or the
/// configuration of a run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A jump's recorded `from` state does not match the state tracked so far.
    #[error(
        "State mismatch in tree {tree_id} on the branch above vertex {vertex}: \
         expected '{expected}' but found '{found}'"
    )]
    StateMismatch {
        tree_id: String,
        vertex: VertexIndex,
        expected: String,
        found: String,
    },

    /// A vertex lacks the discrete-state (or other required) annotation.
    #[error("Vertex {vertex} of tree {tree_id} has no '{attribute}' annotation")]
    MissingAnnotation {
        tree_id: String,
        vertex: VertexIndex,
        attribute: String,
    },

    /// A jump history annotation does not have the expected shape.
    #[error("Malformed '{attribute}' on vertex {vertex} of tree {tree_id}: {reason}")]
    MalformedJump {
        tree_id: String,
        vertex: VertexIndex,
        attribute: String,
        reason: String,
    },

    /// A jump lies outside its branch or before the previous jump.
    #[error(
        "Jump at height {height} on the branch above vertex {vertex} of tree {tree_id} \
         lies outside [{lower}, {upper}]"
    )]
    JumpOutOfOrder {
        tree_id: String,
        vertex: VertexIndex,
        height: f64,
        lower: f64,
        upper: f64,
    },

    #[error(transparent)]
    Import(#[from] ParsingError),

    /// No tree remains after discarding the burn-in.
    #[error("No trees left after discarding burn-in {burn_in:?}")]
    EmptySample { burn_in: Burnin },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Returns whether the error concerns a single lineage of an otherwise
    /// usable tree, so a run may skip that lineage instead of aborting.
    pub fn is_lineage_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::StateMismatch { .. } | AnalysisError::JumpOutOfOrder { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_tree_vertex_and_states() {
        let err = AnalysisError::StateMismatch {
            tree_id: "1000".to_string(),
            vertex: 7,
            expected: "Hubei".to_string(),
            found: "Fujian".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("tree 1000"));
        assert!(message.contains("vertex 7"));
        assert!(message.contains("expected 'Hubei' but found 'Fujian'"));
        assert!(err.is_lineage_local());
        assert!(!AnalysisError::Configuration("x".into()).is_lineage_local());
    }
}
