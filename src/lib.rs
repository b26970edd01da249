//! Jumphistory reconstructs the history of discrete traits (e.g. the
//! location of a virus lineage) along the lineages of posterior tree samples
//! annotated with Markov jumps, as logged by BEAST.
//!
//! Every branch of such a tree may carry the jumps that happened on it, e.g.
//! `[&location="Hubei",history={{2.5,"Hubei","Fujian"}}]`, recorded on the
//! branch's child vertex. From these, this crate rebuilds and validates the
//! sequence of states a lineage went through and reduces many lineages over
//! many trees into tables.
//!
//! Core functionality provided:
//! - Import: Nexus and Newick tree files with BEAST-style annotations,
//!   read lazily so that huge samples are never held in memory
//!   (see [crate::nexus] and [crate::newick]).
//! - [TreeStream](stream::TreeStream): trees one at a time after burn-in,
//!   with forward-only access by position.
//! - [JumpHistoryDecoder](jumps::JumpHistoryDecoder): jump histories of
//!   branches, with optional merging of states.
//! - [StateSetIndex](states::StateSetIndex): grouping of states into the
//!   sets that aggregation tables are indexed by.
//! - [LineageWalker](walker::LineageWalker): validated state intervals
//!   along a lineage, from a vertex up to the root or a stop condition.
//! - Aggregators in [crate::aggregate]: time-binned jump histogram,
//!   transmission chain census, state persistence at given times, per-site
//!   ancestral state propagation, and event counts in a time window.
//! - Analyses in [crate::analysis] combining the above, configured by a
//!   TOML file (see [crate::config]) and run by the `jumphistory` binary.
//!
//! Limitations:
//! - Only binary rooted trees
//! - Lineages are walked tipwards to rootwards only
//!
//! # Usage patterns
//! Walk the lineage of every taxon in a tree file:
//! ```no_run
//! use jumphistory::jumps::JumpHistoryDecoder;
//! use jumphistory::nexus::Burnin;
//! use jumphistory::stream::TreeStream;
//! use jumphistory::walker::{LineageWalker, StopCondition, TimeScale};
//!
//! let walker = LineageWalker::new(
//!     JumpHistoryDecoder::new(),
//!     StopCondition::at_root(),
//!     TimeScale::calendar(2017.25),
//! );
//! let mut stream = TreeStream::open("h7n9.trees", Burnin::Count(1000))?;
//! while let Some(tree) = stream.next_tree()? {
//!     for leaf in tree.leaves() {
//!         let path = walker.walk(&tree, leaf)?;
//!         println!("{:?} left {} at {}", tree.label(leaf), path.start_state(), path.intervals[0].end);
//!     }
//! }
//! # Ok::<(), jumphistory::error::AnalysisError>(())
//! ```
//!
//! Run a configured analysis:
//! ```no_run
//! use jumphistory::analysis::run_analysis;
//! use jumphistory::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_file("chains.toml")?;
//! config.validate()?;
//! let mut analysis = config.build_analysis()?;
//! let mut stream = config.open_stream()?;
//! run_analysis(&mut stream, analysis.as_mut(), &mut std::io::stdout())?;
//! # Ok::<(), jumphistory::error::AnalysisError>(())
//! ```

pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod error;
pub mod jumps;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod parser;
pub mod states;
pub mod stream;
pub mod walker;
