//! Application error types
//!
//! Unified error type for the bot process. Library crates keep their own `thiserror`
//! enums; this is where they meet at the process boundary.

use crate::config::ConfigError;
use std::fmt;

/// Process-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Startup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // Gateway outcomes the process has to react to
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    // REST API
    #[error("API error: {0}")]
    Api(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Process exit code for this error
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            // EX_CONFIG
            Self::Config(_) | Self::Telemetry(_) => 78,
            // EX_NOPERM
            Self::Authentication(_) => 77,
            // EX_UNAVAILABLE
            Self::Gateway(_) | Self::Api(_) => 69,
            // EX_SOFTWARE
            Self::Internal(_) => 70,
        }
    }

    /// Whether restarting the process with the same configuration could help
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::Api(_))
    }

    /// Create a gateway error
    #[must_use]
    pub fn gateway(msg: impl fmt::Display) -> Self {
        Self::Gateway(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
