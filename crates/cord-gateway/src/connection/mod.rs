//! Connection management
//!
//! The connection state machine, reconnect backoff, and the task that drives
//! one socket at a time through them.

mod backoff;
mod machine;
mod runner;
mod state;
mod writer;

pub use backoff::{Backoff, BackoffConfig};
pub use machine::{Action, ConnectionMachine, DisconnectReason};
pub use state::ConnectionState;

pub(crate) use runner::{Command, Runner};
pub(crate) use writer::Outbound;
