//! Sink error types.

use thiserror::Error;

/// Errors that can occur when delivering a report to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The endpoint returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The endpoint refused the payload (4xx other than 408/429).
    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The endpoint failed while handling the payload (5xx).
    #[error("server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Writing the report locally failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, SinkError::Rejected { .. } | SinkError::Io(_))
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SinkError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
