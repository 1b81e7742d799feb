//! Gateway errors

use crate::protocol::{CloseCode, DecodeError, EncodeError};
use crate::session::SessionError;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by the gateway client
///
/// Transport, decode and timeout errors are handled by reconnecting and are
/// only logged. Only the terminal variants reach [`Gateway::wait`](crate::Gateway::wait).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The token was rejected (close 4004)
    #[error("authentication failed: the gateway rejected the token")]
    AuthenticationFailed,

    /// The server closed with a code that forbids reconnecting
    #[error("gateway closed the connection: {0}")]
    FatalClose(CloseCode),

    #[error("invalid presence status: {0}")]
    InvalidPresence(String),

    #[error("gateway is already running")]
    AlreadyRunning,

    #[error("gateway is not running")]
    NotRunning,

    /// The connection task ended abnormally
    #[error("gateway task failed: {0}")]
    Task(String),
}

impl GatewayError {
    /// Check if this error ends the client for good
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::FatalClose(_))
    }
}

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
