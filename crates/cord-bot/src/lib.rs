//! # cord-bot
//!
//! Wires the gateway to a fixed set of prefix commands and replies through
//! the REST client.

pub mod bot;
pub mod commands;

pub use bot::{install_listeners, run, Bot};
pub use commands::{parse_invocation, Command, CommandContext, CommandRegistry, Invocation};
