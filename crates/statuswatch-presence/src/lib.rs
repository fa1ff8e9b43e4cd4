//! # statuswatch-presence
//!
//! Tracks the reachability of monitored entities:
//!
//! - Raw platform presence collapsed into two status classes
//! - Per-entity serialized diffing with cold-start suppression
//! - Transition classification (became reachable / became unreachable)
//! - Durable last-known-status persistence with write-temp-then-rename

pub mod status;
pub mod store;
pub mod tracker;

pub use status::{StatusClass, Transition, TransitionKind};
pub use store::StateStore;
pub use tracker::PresenceTracker;
