//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier parsing and invalid state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Empty or malformed pagination cursor
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Asset reference is not a `sha256:<hex>` content address
    #[error("Invalid asset reference: {0}")]
    InvalidAssetRef(String),

    /// Unknown value source tag
    #[error("Invalid value source: {0}")]
    InvalidValueSource(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
