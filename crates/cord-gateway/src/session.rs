//! Session management
//!
//! Tracks what the client needs to resume a dropped connection: the session id
//! from READY, the highest sequence seen, and the resume endpoint.

use crate::config::Identity;
use crate::events::GatewayEventType;
use crate::protocol::{Frame, IdentifyPayload, OpCode, ResumePayload};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no resumable session: session id or sequence is unset")]
    NoResumableSession,
}

/// Fields of READY the session cares about
#[derive(Deserialize)]
struct ReadySession {
    session_id: String,
    #[serde(default)]
    resume_gateway_url: Option<String>,
}

/// Resumable gateway session
///
/// Owned by the connection manager. The token never leaves this struct except
/// inside Identify and Resume frames.
#[derive(Clone)]
pub struct Session {
    token: String,
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
    heartbeat_interval: Option<Duration>,
    disconnected_at: Option<Instant>,
}

impl Session {
    /// Create an empty session for the given token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            session_id: None,
            sequence: None,
            resume_url: None,
            heartbeat_interval: None,
            disconnected_at: None,
        }
    }

    /// Update session state from an inbound frame
    ///
    /// Keeps the highest sequence seen, stores the heartbeat interval from HELLO,
    /// and the session id and resume URL from READY.
    pub fn observe(&mut self, frame: &Frame) {
        if let Some(seq) = frame.s {
            self.sequence = Some(self.sequence.map_or(seq, |current| current.max(seq)));
        }

        match frame.op {
            OpCode::Hello => {
                if let Some(hello) = frame.as_hello() {
                    self.heartbeat_interval = Some(Duration::from_millis(hello.heartbeat_interval));
                }
            }
            OpCode::Dispatch if frame.is_event(GatewayEventType::Ready.as_str()) => {
                match ReadySession::deserialize(&frame.d) {
                    Ok(ready) => {
                        tracing::debug!(session_id = %ready.session_id, "Session established");
                        self.session_id = Some(ready.session_id);
                        self.resume_url = ready.resume_gateway_url;
                        self.disconnected_at = None;
                    }
                    Err(e) => tracing::warn!(error = %e, "READY without a usable session id"),
                }
            }
            OpCode::Dispatch if frame.is_event(GatewayEventType::Resumed.as_str()) => {
                self.disconnected_at = None;
            }
            _ => {}
        }
    }

    /// Check if a Resume can be attempted
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.session_id.is_some() && self.sequence.is_some()
    }

    /// Build the Resume frame for the current session
    ///
    /// # Errors
    /// Returns [`SessionError::NoResumableSession`] if the session id or sequence is unset
    pub fn resume_payload(&self) -> Result<Frame, SessionError> {
        match (&self.session_id, self.sequence) {
            (Some(session_id), Some(seq)) => Ok(Frame::resume(&ResumePayload {
                token: self.token.clone(),
                session_id: session_id.clone(),
                seq,
            })),
            _ => Err(SessionError::NoResumableSession),
        }
    }

    /// Build the Identify frame for a new session
    #[must_use]
    pub fn identify_payload(&self, identity: &Identity) -> Frame {
        Frame::identify(&IdentifyPayload {
            token: self.token.clone(),
            properties: identity.properties.clone(),
            intents: identity.intents,
        })
    }

    /// Forget the session so the next handshake identifies
    pub fn reset(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
        self.disconnected_at = None;
    }

    /// Forget the session and the token
    pub fn clear(&mut self) {
        self.reset();
        self.heartbeat_interval = None;
        self.token.clear();
    }

    /// Remember when the connection dropped
    ///
    /// Only the first drop counts, so repeated failed attempts do not extend
    /// the resume window.
    pub fn mark_disconnected(&mut self) {
        if self.disconnected_at.is_none() {
            self.disconnected_at = Some(Instant::now());
        }
    }

    /// Reset the session if it has been disconnected longer than `window`
    ///
    /// Returns `true` if the session was discarded.
    pub fn expire_if_stale(&mut self, window: Duration) -> bool {
        let stale = self
            .disconnected_at
            .is_some_and(|at| at.elapsed() > window);

        if stale && self.is_resumable() {
            tracing::info!(
                session_id = ?self.session_id,
                window_secs = window.as_secs(),
                "Resume window elapsed, starting a new session"
            );
            self.reset();
            return true;
        }
        false
    }

    /// Session id from the last READY
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Highest sequence seen
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Endpoint to reconnect to when resuming
    #[must_use]
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// Heartbeat interval from the last HELLO
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    /// Copy of the observable fields, without the token
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            resume_url: self.resume_url.clone(),
            heartbeat_interval_ms: self
                .heartbeat_interval
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence)
            .field("resume_url", &self.resume_url)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub sequence: Option<u64>,
    pub resume_url: Option<String>,
    pub heartbeat_interval_ms: Option<u64>,
}
