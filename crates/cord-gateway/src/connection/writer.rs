//! Socket writer task
//!
//! Single owner of the write half; everything else sends through its channel
//! so frames never interleave.

use crate::protocol::{codec, Frame};
use futures_util::{Sink, SinkExt};
use std::borrow::Cow;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Item queued for the writer
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(Frame),
    /// Send a close frame with this code and stop
    Close(u16),
}

pub(crate) async fn run<S>(mut sink: S, mut outbound: mpsc::Receiver<Outbound>)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                let text = match codec::encode(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(frame = %frame, error = %e, "Failed to encode frame");
                        continue;
                    }
                };
                tracing::trace!(op = %frame.op, "Sending frame");
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::warn!(error = %e, "Failed to write frame to WebSocket");
                    break;
                }
            }
            Outbound::Close(code) => {
                let frame = CloseFrame {
                    code: code.into(),
                    reason: Cow::Borrowed(""),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(code, error = %e, "Failed to send close frame");
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
}
