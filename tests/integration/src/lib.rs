//! Integration test utilities
//!
//! In-process stand-ins for the platform: a WebSocket gateway that tests
//! script frame by frame, and an HTTP API built from axum routes.

pub mod helpers;

pub use helpers::*;
