use crate::aggregate::{ChainRow, PersistenceChainAggregator};
use crate::analysis::{MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::model::Tree;
use std::io::Write;

/// Transmission chain census, one tab-separated [ChainRow] per introduction.
///
/// A tree that cannot be censused completely (e.g. a vertex without state)
/// contributes no rows at all.
pub struct TransmissionChainAnalysis {
    aggregator: PersistenceChainAggregator,
    policy: MismatchPolicy,
}

impl TransmissionChainAnalysis {
    pub fn new(aggregator: PersistenceChainAggregator) -> Self {
        TransmissionChainAnalysis {
            aggregator,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl TreeAnalysis for TransmissionChainAnalysis {
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        writeln!(out, "{}", ChainRow::HEADER)?;
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
