//! Connection state machine
//!
//! Pure protocol logic: inputs are decoded frames, close codes and timer
//! signals, outputs are [`Action`]s for the runner to carry out. No I/O happens
//! here, which keeps every transition testable without a socket.

use super::{Backoff, ConnectionState};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::events::GatewayEventType;
use crate::protocol::{CloseDisposition, Frame, OpCode};
use crate::session::Session;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Side effect requested by the state machine
#[derive(Debug)]
pub enum Action {
    /// Write a frame to the socket
    Send(Frame),
    /// (Re)start the heartbeat scheduler with this interval
    StartHeartbeat(Duration),
    /// Record a heartbeat ACK
    AckHeartbeat,
    /// The server asked for a heartbeat right now
    HeartbeatNow,
    /// Hand a Dispatch frame to the listeners
    Dispatch(Frame),
    /// Tear the socket down and reconnect after backoff
    Disconnect(DisconnectReason),
    /// Stop for good and surface the error
    Terminate(GatewayError),
}

/// Why a live connection is being torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the socket (`None` when no close frame was received)
    Closed(Option<u16>),
    /// The server sent op 7
    ReconnectRequested,
    /// The server sent op 9
    InvalidSession { resumable: bool },
    /// A heartbeat went unacknowledged
    ZombieConnection,
    /// The socket opened but HELLO never came
    HelloTimeout,
    /// Socket or connect failure
    Transport(String),
    /// The server broke the protocol
    Protocol(&'static str),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(Some(code)) => write!(f, "server closed with code {code}"),
            Self::Closed(None) => f.write_str("connection dropped"),
            Self::ReconnectRequested => f.write_str("server requested reconnect"),
            Self::InvalidSession { resumable } => {
                write!(f, "invalid session (resumable: {resumable})")
            }
            Self::ZombieConnection => f.write_str("heartbeat not acknowledged"),
            Self::HelloTimeout => f.write_str("no HELLO from the server"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Protocol(e) => write!(f, "protocol violation: {e}"),
        }
    }
}

/// Gateway connection state machine
#[derive(Debug)]
pub struct ConnectionMachine {
    config: GatewayConfig,
    state: ConnectionState,
    session: Session,
    backoff: Backoff,
}

impl ConnectionMachine {
    #[must_use]
    pub fn new(config: GatewayConfig, token: impl Into<String>) -> Self {
        let backoff = Backoff::new(config.backoff.clone());
        Self {
            config,
            state: ConnectionState::Disconnected,
            session: Session::new(token),
            backoff,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of reconnect delays handed out since the last successful handshake
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }

    /// Start a connection attempt and return the URL to open
    ///
    /// Resumable sessions reconnect to their resume endpoint, everything else
    /// to the configured gateway URL.
    pub fn begin_connect(&mut self) -> String {
        self.session.expire_if_stale(self.config.resume_window);

        let base = match self.session.resume_url() {
            Some(url) if self.session.is_resumable() => url.to_string(),
            _ => self.config.url.clone(),
        };

        self.transition(ConnectionState::Connecting);
        self.config.connect_url(&base)
    }

    /// The socket is open; the server speaks first
    pub fn socket_opened(&mut self) {
        self.transition(ConnectionState::AwaitingHello);
    }

    /// Feed one decoded inbound frame
    pub fn handle_frame(&mut self, frame: Frame) -> Vec<Action> {
        if !self.state.has_socket() {
            debug!(frame = %frame, state = %self.state, "Ignoring frame outside a live connection");
            return Vec::new();
        }

        self.session.observe(&frame);

        match frame.op {
            OpCode::Hello => self.on_hello(&frame),
            OpCode::HeartbeatAck => vec![Action::AckHeartbeat],
            OpCode::Heartbeat => vec![Action::HeartbeatNow],
            OpCode::Reconnect => self.disconnect(DisconnectReason::ReconnectRequested),
            OpCode::InvalidSession => {
                let resumable = frame.invalid_session_resumable().unwrap_or(false);
                if !resumable {
                    self.session.reset();
                }
                self.disconnect(DisconnectReason::InvalidSession { resumable })
            }
            OpCode::Dispatch => self.on_dispatch(frame),
            OpCode::Identify | OpCode::PresenceUpdate | OpCode::Resume => {
                warn!(op = %frame.op, "Server sent a client-only op code");
                Vec::new()
            }
            OpCode::Unknown(op) => {
                debug!(op, "Ignoring unknown op code");
                Vec::new()
            }
        }
    }

    /// The server closed the socket, or it dropped without a close frame
    pub fn handle_close(&mut self, code: Option<u16>) -> Vec<Action> {
        if self.state.is_closed() {
            return Vec::new();
        }

        match CloseDisposition::from_code(code) {
            CloseDisposition::Resume => self.disconnect(DisconnectReason::Closed(code)),
            CloseDisposition::Reidentify => {
                self.session.reset();
                self.disconnect(DisconnectReason::Closed(code))
            }
            CloseDisposition::AuthenticationFailed => {
                self.session.clear();
                self.transition(ConnectionState::Closed);
                vec![Action::Terminate(GatewayError::AuthenticationFailed)]
            }
            CloseDisposition::Fatal(close_code) => {
                self.session.clear();
                self.transition(ConnectionState::Closed);
                vec![Action::Terminate(GatewayError::FatalClose(close_code))]
            }
        }
    }

    /// The heartbeat scheduler detected a missing ACK
    pub fn handle_zombie(&mut self) -> Vec<Action> {
        if !self.state.has_socket() {
            return Vec::new();
        }
        self.disconnect(DisconnectReason::ZombieConnection)
    }

    /// The HELLO deadline passed; ignored once the handshake moved on
    pub fn handle_hello_timeout(&mut self) -> Vec<Action> {
        if self.state != ConnectionState::AwaitingHello {
            return Vec::new();
        }
        warn!("Socket opened but the server never sent HELLO");
        self.disconnect(DisconnectReason::HelloTimeout)
    }

    /// Connecting, reading or writing failed
    pub fn handle_transport_error(&mut self, error: impl Into<String>) -> Vec<Action> {
        if matches!(self.state, ConnectionState::Reconnecting | ConnectionState::Closed) {
            return Vec::new();
        }
        self.disconnect(DisconnectReason::Transport(error.into()))
    }

    /// Delay before the next connection attempt
    pub fn next_backoff(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    /// Explicit stop: forget the session and close for good
    pub fn shutdown(&mut self) {
        self.session.clear();
        self.transition(ConnectionState::Closed);
    }

    fn on_hello(&mut self, frame: &Frame) -> Vec<Action> {
        let interval = frame
            .as_hello()
            .map(|hello| Duration::from_millis(hello.heartbeat_interval))
            .filter(|d| !d.is_zero());
        let Some(interval) = interval else {
            warn!("HELLO without a usable heartbeat interval");
            return self.disconnect(DisconnectReason::Protocol("HELLO without heartbeat_interval"));
        };

        let mut actions = vec![Action::StartHeartbeat(interval)];
        if self.state != ConnectionState::AwaitingHello {
            debug!(state = %self.state, "HELLO outside the handshake, restarting heartbeat only");
            return actions;
        }

        match self.session.resume_payload() {
            Ok(resume) => {
                info!(
                    session_id = ?self.session.session_id(),
                    seq = ?self.session.sequence(),
                    "Resuming session"
                );
                self.transition(ConnectionState::Resuming);
                actions.push(Action::Send(resume));
            }
            Err(_) => {
                info!(intents = %self.config.identity.intents, "Identifying new session");
                self.transition(ConnectionState::Identifying);
                actions.push(Action::Send(self.session.identify_payload(&self.config.identity)));
            }
        }
        actions
    }

    fn on_dispatch(&mut self, frame: Frame) -> Vec<Action> {
        if frame.is_event(GatewayEventType::Ready.as_str()) {
            info!(session_id = ?self.session.session_id(), "Session ready");
            self.backoff.reset();
            self.transition(ConnectionState::Connected);
        } else if frame.is_event(GatewayEventType::Resumed.as_str()) {
            info!(seq = ?self.session.sequence(), "Session resumed");
            self.backoff.reset();
            self.transition(ConnectionState::Connected);
        }
        vec![Action::Dispatch(frame)]
    }

    fn disconnect(&mut self, reason: DisconnectReason) -> Vec<Action> {
        self.session.mark_disconnected();
        self.transition(ConnectionState::Reconnecting);
        vec![Action::Disconnect(reason)]
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Connection state changed");
            self.state = next;
        }
    }
}
