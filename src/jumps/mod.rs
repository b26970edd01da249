//! Markov-jump histories attached to tree branches.
//!
//! BEAST logs the jumps of a branch on the branch's child vertex, e.g.
//! `[&history={{4.1,Hubei,Fujian},{2.5,Zhejiang,Hubei}}]`, oldest jump first.
//! [decode] turns such an annotation into [JumpEvent]s; the
//! [JumpHistoryDecoder] bundles attribute names, tuple layout and state
//! merging for repeated use.

mod decoder;
mod event;

pub use self::decoder::{
    DEFAULT_HISTORY_ATTRIBUTE, DEFAULT_STATE_ATTRIBUTE, JumpHistoryDecoder, decode,
};
pub use self::event::{JumpEvent, JumpLayout};
