//! Analyses run over a tree sample, each writing one table.
//!
//! An analysis implements [TreeAnalysis] and is driven tree by tree by
//! [run_analysis]. The analyses differ in which lineages they follow
//! (see [LineageSelection]) and how they reduce them:
//!
//! | Analysis | Table |
//! |---|---|
//! | [TaxaJumpAnalysis] | state intervals of taxon or clade lineages |
//! | [TransmissionChainAnalysis] | transmission chain census per introduction |
//! | [PersistenceTimeAnalysis] | state persistence of lineages alive at given times |
//! | [JumpHistogramAnalysis] | jumps per from/to set and time bin |
//! | [AncestralStateAnalysis] | per-site states at all vertices |
//! | [EventCountAnalysis] | coalescent events and jumps within a window |
//!
//! Output rows go to the sink passed to [run_analysis]; diagnostics go
//! through `log`.

mod ancestral;
mod chains;
mod event_counts;
mod jump_histogram;
mod persistence_times;
mod selection;
mod taxa_jumps;

pub use self::ancestral::AncestralStateAnalysis;
pub use self::chains::TransmissionChainAnalysis;
pub use self::event_counts::EventCountAnalysis;
pub use self::jump_histogram::JumpHistogramAnalysis;
pub use self::persistence_times::PersistenceTimeAnalysis;
pub use self::selection::{LineageSelection, LineageStart, MatchMode, MismatchPolicy};
pub use self::taxa_jumps::TaxaJumpAnalysis;

use crate::error::AnalysisError;
use crate::model::Tree;
use crate::stream::TreeStream;
use std::io::Write;

/// One analysis over a tree sample.
pub trait TreeAnalysis {
    /// Writes the table header, before any tree.
    fn write_header(&mut self, out: &mut dyn Write) -> Result<(), AnalysisError>;

    /// Processes one tree, writing any rows it yields.
    fn process_tree(&mut self, tree: &Tree, out: &mut dyn Write) -> Result<(), AnalysisError>;

    /// Writes what is only known after the last tree.
    fn finish(&mut self, _out: &mut dyn Write) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// Runs `analysis` over all trees of `stream`, in order, writing to `sink`.
///
/// # Returns
/// The number of trees processed.
///
/// # Errors
/// Stops at the first error of the stream, the analysis, or the sink.
pub fn run_analysis<A, W>(
    stream: &mut TreeStream,
    analysis: &mut A,
    sink: &mut W,
) -> Result<usize, AnalysisError>
where
    A: TreeAnalysis + ?Sized,
    W: Write,
{
    analysis.write_header(sink)?;
    let mut num_trees = 0;
    while let Some(tree) = stream.next_tree()? {
        analysis.process_tree(&tree, sink)?;
        num_trees += 1;
    }
    analysis.finish(sink)?;
    sink.flush()?;
    log::info!("Analysed {num_trees} trees");
    Ok(num_trees)
}
