//! Transaction consumption state machine.
//!
//! [`machine`] holds the pure merge rules; [`ConsumptionTracker`] applies
//! them to one shared snapshot and plugs into the listener registry.

pub mod machine;
mod tracker;

pub use machine::{IgnoreReason, Transition, merge};
pub use tracker::ConsumptionTracker;
