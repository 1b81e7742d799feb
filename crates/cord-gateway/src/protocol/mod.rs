//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, frame format, codec, and close codes.

pub mod codec;
mod close_codes;
mod frame;
mod opcodes;
mod payloads;

pub use close_codes::{CloseCode, CloseDisposition};
pub use codec::{decode, decode_str, encode, DecodeError, EncodeError};
pub use frame::Frame;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload, ResumePayload,
};
