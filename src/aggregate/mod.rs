//! Reductions of jumps, intervals and trees into the tables of an analysis.
//!
//! * [TimeBinHistogram]: jumps per from/to state set and time bin
//! * [PersistenceChainAggregator]: transmission chain census per introduction
//! * [PersistenceTimeAggregator]: state persistence of lineages alive at given times
//! * [AncestralPropagationAggregator]: per-site states propagated root to tips
//! * [IntervalTally]: events within a time window

mod histogram;
mod persistence;
mod persistence_time;
mod propagation;
mod tally;

pub use self::histogram::TimeBinHistogram;
pub use self::persistence::{ChainRow, PersistenceChainAggregator};
pub use self::persistence_time::{EvaluationPoint, PersistenceRow, PersistenceTimeAggregator};
pub use self::propagation::{AncestralPropagationAggregator, GeneticCode, SiteStates};
pub use self::tally::IntervalTally;
