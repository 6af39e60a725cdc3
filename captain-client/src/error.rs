//! Client error types

use thiserror::Error;

/// Backend call failure
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, DNS or TLS failure before a response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No response within the request timeout
    #[error("Request timed out")]
    Timeout,

    /// Access token missing or expired
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// Request rejected as malformed (HTTP 400/422)
    #[error("Rejected by backend: {0}")]
    Validation(String),

    /// Any other non-success status
    #[error("Backend error {status}: {body}")]
    Server { status: u16, body: String },

    /// Body was not valid JSON
    #[error("Malformed response body: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a non-success HTTP status and its body
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            400 | 422 => Self::Validation(body),
            _ => Self::Server { status, body },
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the user has to log in again
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
