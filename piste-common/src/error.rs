//! Common error types for the piste workspace

use thiserror::Error;

/// Common result type for piste operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the clustering engine and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// Caller contract violation (e.g. a fixed-area search with a
    /// non-polygon geometry). Aborts the run.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Requested object not found in the store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spatial object store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
