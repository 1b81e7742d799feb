//! JSON codec for gateway frames

use super::{Frame, OpCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding an inbound frame
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or `op` is not an integer in 0..=255
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON, but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// A Dispatch frame arrived without a sequence number
    #[error("dispatch frame is missing its sequence number")]
    MissingSequence,

    /// A Dispatch frame arrived without an event name
    #[error("dispatch frame is missing its event name")]
    MissingEventName,
}

/// Error produced while encoding an outbound frame
#[derive(Debug, Error)]
#[error("failed to encode frame: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Serialize a frame to its JSON text form
pub fn encode(frame: &Frame) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode a frame from raw bytes
pub fn decode(bytes: &[u8]) -> Result<Frame, DecodeError> {
    from_value(serde_json::from_slice(bytes)?)
}

/// Decode a frame from a text message
pub fn decode_str(text: &str) -> Result<Frame, DecodeError> {
    from_value(serde_json::from_str(text)?)
}

// Frame's derived Deserialize also accepts sequences; only objects are frames
fn from_value(value: Value) -> Result<Frame, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    validate(Frame::deserialize(value)?)
}

fn validate(frame: Frame) -> Result<Frame, DecodeError> {
    if frame.op == OpCode::Dispatch {
        if frame.s.is_none() {
            return Err(DecodeError::MissingSequence);
        }
        if frame.t.is_none() {
            return Err(DecodeError::MissingEventName);
        }
    }
    Ok(frame)
}
