//! Error types for the HTTP adapter

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by remote record operations
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-success status
    #[error("HTTP {status} from {operation}: {message}")]
    Http {
        operation: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response
    #[error("network error during {operation}: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not what the protocol promises
    #[error("malformed response from {operation}: {message}")]
    Decode { operation: String, message: String },

    /// Client construction failed
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Reading a local asset file failed
    #[error("asset I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn http(operation: &str, status: StatusCode, message: impl Into<String>) -> Self {
        RemoteError::Http {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn network(operation: &str, source: reqwest::Error) -> Self {
        RemoteError::Network {
            operation: operation.to_string(),
            source,
        }
    }

    pub fn decode(operation: &str, message: impl Into<String>) -> Self {
        RemoteError::Decode {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// True for failures worth retrying: connection problems, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network { .. } => true,
            RemoteError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            RemoteError::Decode { .. } | RemoteError::Config(_) | RemoteError::Io(_) => false,
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
