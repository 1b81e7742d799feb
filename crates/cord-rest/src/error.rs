//! REST client errors

use reqwest::StatusCode;
use thiserror::Error;

/// REST client errors
#[derive(Debug, Error)]
pub enum RestError {
    /// Connection, timeout, or body decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an unexpected status
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("invalid invite: {0}")]
    InvalidInvite(String),

    /// An authenticated endpoint was called before a token was set
    #[error("no token set")]
    MissingToken,
}

impl RestError {
    /// HTTP status of an API error
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Result alias for REST operations
pub type RestResult<T> = Result<T, RestError>;
