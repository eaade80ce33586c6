//! Storage boundaries for PulseTrack.
//!
//! Two seams live here, both trait-based so the sync engine can be driven
//! by in-memory fakes in tests:
//! - [`KeyValueStore`]: durable client-side persistence for the offline
//!   queue and conflict documents
//! - [`WorkoutBackend`]: the opaque remote service that owns workout logs
//!
//! # Design Principles
//! - Backend isolation: no backend-specific logic leaks into the sync engine
//! - Async operations: all I/O operations are async
//! - Unified error semantics: consistent error types across implementations

pub mod backend;
pub mod kv;
pub mod local;
pub mod memory;

pub use backend::{CompletedExercise, WorkoutBackend, WorkoutLog, WorkoutLogEntry, WorkoutLogPatch};
pub use kv::KeyValueStore;
pub use local::FileStore;
pub use memory::{MemoryBackend, MemoryStore};
