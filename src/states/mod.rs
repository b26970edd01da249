//! Discrete states and the sets they are grouped into for aggregation.
//!
//! Raw state labels pass through an optional [StateMerger] (e.g. cities onto
//! provinces) and are then resolved to the [StateSet]s of a
//! [StateSetIndex]. When no states are configured, [discover_states] finds
//! every state of a tree file in a quick textual pre-pass.

mod discovery;
mod merge;
mod state_set;

pub use self::discovery::{discover_states, discover_states_in_str};
pub use self::merge::StateMerger;
pub use self::state_set::{SetMode, StateSet, StateSetIndex};
