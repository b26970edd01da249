use crate::aggregate::TimeBinHistogram;
use crate::analysis::{LineageSelection, MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::model::{Tree, VertexIndex};
use crate::walker::LineageWalker;
use std::collections::HashSet;
use std::io::Write;

/// Histogram of jumps over time, written after the last tree.
///
/// Without a selection all branches of every tree contribute. With selected
/// or ignored taxa, the jumps on their lineages up to the root contribute, each branch
/// once however many lineages share it. With MRCA taxa, the jumps within
/// the clade (from its leaves up to the MRCA) contribute.
pub struct JumpHistogramAnalysis {
    walker: LineageWalker,
    selection: LineageSelection,
    histogram: TimeBinHistogram,
    normalize: bool,
    policy: MismatchPolicy,
}

impl JumpHistogramAnalysis {
    pub fn new(walker: LineageWalker, selection: LineageSelection, histogram: TimeBinHistogram) -> Self {
        JumpHistogramAnalysis {
            walker,
            selection,
            histogram,
            normalize: false,
            policy: MismatchPolicy::default(),
        }
    }

    /// Reports mean counts per tree instead of totals.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn histogram(&self) -> &TimeBinHistogram {
        &self.histogram
    }

    fn record_all_branches(&mut self, tree: &Tree) -> Result<(), AnalysisError> {
        let time_scale = self.walker.time_scale();
        for vertex in 0..tree.num_vertices() {
            if tree.is_root(vertex) {
                continue;
            }
            let jumps = match self.walker.decoder().decode_merged(tree, vertex) {
                Ok(jumps) => jumps.unwrap_or_default(),
                Err(e) => {
                    self.policy
                        .recover(e, &format!("branch above vertex {vertex} in tree {}", tree.id()))?;
                    continue;
                }
            };
            for jump in jumps {
                self.histogram
                    .record(time_scale.adjust(jump.time), &jump.from, &jump.to);
            }
        }
        Ok(())
    }

    fn record_lineages(&mut self, tree: &Tree) -> Result<(), AnalysisError> {
        let (starts, ancestor): (Vec<VertexIndex>, Option<VertexIndex>) = match self.selection.clade(tree) {
            Some((mrca, members)) => (members, Some(mrca)),
            None if self.selection.mrca_taxa.is_empty() => (self.selection.selected_leaves(tree), None),
            None => return Ok(()),
        };

        // Lineages merge towards the root; count every branch once
        let mut seen_branches: HashSet<VertexIndex> = HashSet::new();
        for start in starts {
            let walked = match ancestor {
                Some(mrca) => self.walker.walk_to(tree, start, mrca),
                None => self.walker.walk(tree, start),
            };
            let path = match walked {
                Ok(path) => path,
                Err(e) => {
                    self.policy
                        .recover(e, &format!("lineage from vertex {start} in tree {}", tree.id()))?;
                    continue;
                }
            };

            let new_branches: HashSet<VertexIndex> = path
                .transitions
                .iter()
                .map(|t| t.branch)
                .filter(|b| !seen_branches.contains(b))
                .collect();
            for transition in path.transitions.iter().filter(|t| new_branches.contains(&t.branch)) {
                self.histogram
                    .record(transition.time, &transition.from, &transition.to);
            }
            seen_branches.extend(new_branches);
        }
        Ok(())
    }
}

impl TreeAnalysis for JumpHistogramAnalysis {
    fn write_header(&mut self, _out: &mut dyn Write) -> Result<(), AnalysisError> {
        // The header names the from/to columns and is written with the table
        Ok(())
    }

    fn process_tree(&mut self, tree: &Tree, _out: &mut dyn Write) -> Result<(), AnalysisError> {
        self.histogram.mark_tree();
        if self.selection.is_empty() {
            self.record_all_branches(tree)
        } else {
            self.record_lineages(tree)
        }
    }

    fn finish(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        log::info!(
            "Counted {} jumps over {} trees",
            self.histogram.num_recorded(),
            self.histogram.num_trees()
        );
        self.histogram.write_tsv(out, self.normalize)?;
        Ok(())
    }
}
