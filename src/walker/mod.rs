//! Reconstruction of the state history of single lineages.
//!
//! A [LineageWalker] follows a lineage from a start vertex towards the root,
//! replaying the Markov jumps on every branch, and returns the validated
//! sequence of [StateInterval]s as a [LineagePath].

mod path;
mod time;
#[allow(clippy::module_inception)]
mod walker;

pub use self::path::{LineagePath, StateInterval, StopReason, Transition};
pub use self::time::TimeScale;
pub use self::walker::{LineageWalker, StopCondition};
