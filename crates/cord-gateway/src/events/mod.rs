//! Gateway events
//!
//! Names and typed payloads of the dispatch events listeners usually care about.
//! Listeners receive raw JSON and can parse it into these with
//! [`DispatchEvent::parse`](crate::DispatchEvent::parse).

mod event_types;
mod payloads;

pub use event_types::GatewayEventType;
pub use payloads::{
    MessageCreateEvent, MessageDeleteEvent, ReadyEvent, TypingStartEvent, UnavailableGuild,
};
