use crate::aggregate::IntervalTally;
use crate::analysis::{MismatchPolicy, TreeAnalysis};
use crate::error::AnalysisError;
use crate::jumps::JumpHistoryDecoder;
use crate::model::Tree;
use crate::walker::TimeScale;
use std::io::Write;

/// Per tree, the number of coalescent events (internal vertices) and of
/// jumps dated within a window.
pub struct EventCountAnalysis {
    decoder: JumpHistoryDecoder,
    time_scale: TimeScale,
    window_start: f64,
    window_end: f64,
    policy: MismatchPolicy,
}

impl EventCountAnalysis {
    pub const HEADER: &'static str = "treeId\twindowStart\twindowEnd\tcoalescentEvents\tjumps";

    /// Counts within `[window_start, window_end]` in the times of `time_scale`.
    pub fn new(decoder: JumpHistoryDecoder, time_scale: TimeScale, window_start: f64, window_end: f64) -> Self {
        EventCountAnalysis {
            decoder,
            time_scale,
            window_start,
            window_end,
            policy: MismatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn tally(&self, tree: &Tree) -> Result<(IntervalTally, IntervalTally), AnalysisError> {
        let mut coalescent = IntervalTally::new(self.window_start, self.window_end);
        let mut jumps = IntervalTally::new(self.window_start, self.window_end);
        for vertex in 0..tree.num_vertices() {
            if !tree.is_leaf(vertex) {
                coalescent.record(self.time_scale.adjust(tree.height(vertex)));
            }
            if tree.is_root(vertex) {
                continue;
            }
            for jump in self.decoder.decode_merged(tree, vertex)?.unwrap_or_default() {
                jumps.record(self.time_scale.adjust(jump.time));
            }
        }
        Ok((coalescent, jumps))
    }
}

impl TreeAnalysis for EventCountAnalysis {
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError> {
        writeln!(out, "{}", Self::HEADER)?;
        Ok(())
    }

    fn process_tree(&mut self, tree: &Tree, out: &mut dyn Write) -> Result<(), AnalysisError> {
        match self.tally(tree) {
            Ok((coalescent, jumps)) => {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    tree.id(),
                    self.window_start,
                    self.window_end,
                    coalescent.count(),
                    jumps.count()
                )?;
                Ok(())
            }
            Err(e) => self.policy.recover(e, &format!("tree {}", tree.id())),
        }
    }
}
