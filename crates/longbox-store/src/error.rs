//! Error types for local persistence

use thiserror::Error;

/// Errors raised while reading or writing local files
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot writer task is no longer running
    #[error("snapshot writer has stopped")]
    WriterStopped,
}
