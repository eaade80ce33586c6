//! Common error types for PulseTrack.

use thiserror::Error;

/// Top-level error type for PulseTrack operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local persistence read/write failed (corruption, quota).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed input caught before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote write or query failed (network, backend rejection).
    #[error("Sync error: {0}")]
    Sync(String),

    /// A probable duplicate of the record already exists remotely.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
