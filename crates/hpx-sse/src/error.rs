//! Error handling for the SSE client.

use std::time::Duration;

use thiserror::Error;

/// The result type used throughout the SSE client.
pub type SseResult<T> = Result<T, SseError>;

/// Errors surfaced by an SSE connection.
///
/// Decode problems (malformed UTF-8, unknown fields) are never reported here;
/// only transport-level failures and configuration mistakes are.
#[derive(Error, Debug)]
pub enum SseError {
    /// HTTP request errors (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("SSE endpoint returned status {status}")]
    InvalidStatus { status: http::StatusCode },

    /// The server answered with something other than `text/event-stream`.
    #[error("SSE endpoint returned content type {content_type:?}")]
    InvalidContentType { content_type: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Failures reported by a custom [`SseTransport`](crate::transport::SseTransport).
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl SseError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an invalid status error.
    pub fn invalid_status(status: http::StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    /// Create an invalid content type error.
    pub fn invalid_content_type(content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            content_type: content_type.into(),
        }
    }

    /// Returns `true` for request or idle timeouts, including those reported
    /// by the HTTP client itself.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
