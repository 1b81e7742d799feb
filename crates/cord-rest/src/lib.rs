//! # cord-rest
//!
//! Stateless HTTP client for the platform's REST API: send messages, join
//! guilds by invite, trigger typing, create threads, and log in with a
//! password and optional TOTP code. Requests are not retried or queued.

mod client;
mod error;
mod models;

pub use client::{parse_invite_code, RestClient};
pub use error::{RestError, RestResult};
pub use models::{Invite, InviteChannel, InviteGuild, LoginOutcome, Thread, THREAD_TYPE_PUBLIC};
