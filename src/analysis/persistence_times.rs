use crate::aggregate::{PersistenceRow, PersistenceTimeAggregator};
use crate::analysis::{MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::model::Tree;
use std::io::Write;

/// State persistence at evaluation times, one comma-separated
/// [PersistenceRow] per lineage alive at each time.
///
/// Like the chain census, a tree contributes all its rows or none.
pub struct PersistenceTimeAnalysis {
    aggregator: PersistenceTimeAggregator,
    policy: MismatchPolicy,
}

impl PersistenceTimeAnalysis {
    pub fn new(aggregator: PersistenceTimeAggregator) -> Self {
        PersistenceTimeAnalysis {
            aggregator,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl TreeAnalysis for PersistenceTimeAnalysis {
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        writeln!(out, "{}", PersistenceRow::HEADER)?;
        Ok(())
    }

    fn process_tree(&mut self, tree: &Tree, out: &mut dyn Write) -> Result<(), AnalysisError> {
        match self.aggregator.process_tree(tree) {
            Ok(rows) => {
                for row in rows {
                    writeln!(out, "{row}")?;
                }
                Ok(())
            }
            Err(e) => self.policy.recover(e, &format!("tree {}", tree.id())),
        }
    }
}
