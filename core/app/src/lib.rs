//! PulseTrack application layer.
//!
//! Wires the storage seams, sync engine, and connectivity observation into
//! the public tracking facade used by the presentation layer.

pub mod tracker;

pub use tracker::{LogOutcome, WorkoutTracker};
