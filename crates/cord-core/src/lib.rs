//! # cord-core
//!
//! Domain layer shared by the gateway, the REST client and the bot: snowflake ids,
//! gateway intents, and the wire entities the platform sends back.
//! This crate has no I/O and no async runtime dependency.

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{CreateMessage, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message, MessageReference, User};
pub use value_objects::{Intents, Snowflake, SnowflakeParseError};
