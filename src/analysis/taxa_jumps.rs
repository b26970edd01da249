use crate::analysis::{LineageSelection, MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::model::Tree;
use crate::walker::{LineagePath, LineageWalker};
use std::io::Write;

/// State intervals along the lineages of selected taxa or of a clade MRCA,
/// one comma-separated row per interval.
pub struct TaxaJumpAnalysis {
    walker: LineageWalker,
    selection: LineageSelection,
    policy: MismatchPolicy,
}

impl TaxaJumpAnalysis {
    pub const HEADER: &'static str = "taxonId,treeId,location,startTime,endTime";

    pub fn new(walker: LineageWalker, selection: LineageSelection) -> Self {
        TaxaJumpAnalysis {
            walker,
            selection,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn write_path(
        out: &mut dyn Write,
        label: &str,
        tree: &Tree,
        path: &LineagePath,
    ) -> Result<(), AnalysisError> {
        for interval in &path.intervals {
            writeln!(
                out,
                "{label},{},{},{},{}",
                tree.id(),
                interval.state,
                interval.start,
                interval.end
            )?;
        }
        Ok(())
    }
}

impl TreeAnalysis for TaxaJumpAnalysis {
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        writeln!(out, "{}", Self::HEADER)?;
        Ok(())
    }

    /// Walks every selected lineage before writing, so a tree that aborts
    /// the run leaves no rows behind.
    fn process_tree(&mut self, tree: &Tree, out: &mut dyn Write) -> Result<(), AnalysisError> {
        let mut paths = Vec::new();
        for start in self.selection.starts(tree) {
            match self.walker.walk(tree, start.vertex) {
                Ok(path) => paths.push((start.label, path)),
                Err(e) => self
                    .policy
                    .recover(e, &format!("lineage of {} in tree {}", start.label, tree.id()))?,
            }
        }
        for (label, path) in &paths {
            Self::write_path(out, label, tree, path)?;
        }
        Ok(())
    }
}
