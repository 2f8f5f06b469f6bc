//! Error types for the asset pipeline

use thiserror::Error;

/// Errors that can occur while preparing an asset for transport
#[derive(Debug, Error)]
pub enum AssetError {
    /// Input bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// JPEG encoding failed
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// Pipeline has no quality to try
    #[error("quality ladder is empty")]
    EmptyLadder,

    /// Writing the temporary file failed
    #[error("asset I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Digest could not form a valid content reference
    #[error("invalid asset reference: {0}")]
    Reference(#[from] longbox_core::domain::DomainError),

    /// Blocking worker panicked or was cancelled
    #[error("asset worker failed: {0}")]
    Worker(String),
}
