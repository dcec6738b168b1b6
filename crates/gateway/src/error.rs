use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by gateway implementations.
///
/// `Network` and `Server` are transient and safe to retry; the rest report a
/// definite answer from the backend and retrying will not change it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error with status {0}")]
    Server(StatusCode),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// True for failures worth retrying with the same request.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Server(_))
    }
}
