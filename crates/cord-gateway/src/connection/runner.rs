//! Connection runner
//!
//! The task behind a started gateway. Opens one socket at a time, feeds
//! everything it reads into the [`ConnectionMachine`], and carries out the
//! actions it returns: writes, heartbeats, dispatches, reconnects.

use super::writer::{self, Outbound};
use super::{Action, ConnectionMachine, ConnectionState};
use crate::config::GatewayConfig;
use crate::dispatch::EventDispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::heartbeat::HeartbeatScheduler;
use crate::protocol::{codec, Frame, PresenceUpdatePayload};
use crate::session::SessionSnapshot;
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code sent when dropping a socket we intend to resume
const CLOSE_RESUME: u16 = 4000;
/// Close code sent on an orderly stop
const CLOSE_NORMAL: u16 = 1000;
/// How long the writer gets to flush the close frame
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Commands from the [`Gateway`](crate::Gateway) handle
#[derive(Debug)]
pub(crate) enum Command {
    UpdatePresence(PresenceUpdatePayload),
    Shutdown,
}

/// How one socket ended
enum Outcome {
    Reconnect,
    Shutdown,
    Terminated(GatewayError),
}

pub(crate) struct Runner {
    config: GatewayConfig,
    machine: ConnectionMachine,
    dispatcher: EventDispatcher,
    commands: mpsc::Receiver<Command>,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Arc<RwLock<SessionSnapshot>>,
}

impl Runner {
    pub(crate) fn new(
        config: GatewayConfig,
        token: String,
        dispatcher: EventDispatcher,
        commands: mpsc::Receiver<Command>,
        state: Arc<watch::Sender<ConnectionState>>,
        session: Arc<RwLock<SessionSnapshot>>,
    ) -> Self {
        Self {
            machine: ConnectionMachine::new(config.clone(), token),
            config,
            dispatcher,
            commands,
            state,
            session,
        }
    }

    /// Run until stopped or a terminal close
    pub(crate) async fn run(mut self) -> GatewayResult<()> {
        let result = self.run_loop().await;
        self.publish();

        let Self { dispatcher, .. } = self;
        dispatcher.shutdown().await;

        match &result {
            Ok(()) => tracing::info!("Gateway stopped"),
            Err(e) => tracing::error!(error = %e, "Gateway stopped with a terminal error"),
        }
        result
    }

    async fn run_loop(&mut self) -> GatewayResult<()> {
        loop {
            let url = self.machine.begin_connect();
            self.publish();
            tracing::info!(url = %url, attempt = self.machine.attempt(), "Connecting to gateway");

            let outcome = match self.connect(&url).await {
                Ok(Some(socket)) => {
                    self.machine.socket_opened();
                    self.publish();
                    self.drive(socket).await
                }
                Ok(None) => Outcome::Shutdown,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to connect to gateway");
                    self.machine.handle_transport_error(e.to_string());
                    Outcome::Reconnect
                }
            };

            match outcome {
                Outcome::Reconnect => {}
                Outcome::Shutdown => {
                    self.machine.shutdown();
                    return Ok(());
                }
                Outcome::Terminated(error) => return Err(error),
            }

            self.publish();
            let delay = self.machine.next_backoff();
            tracing::info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = self.machine.attempt(),
                "Reconnecting after backoff"
            );

            if !self.sleep_or_shutdown(delay).await {
                self.machine.shutdown();
                return Ok(());
            }
        }
    }

    /// Open the socket, giving up on timeout; `None` means a stop was requested
    async fn connect(&mut self, url: &str) -> GatewayResult<Option<Socket>> {
        let timeout = self.config.connect_timeout;
        let connecting = tokio::time::timeout(timeout, connect_async(url));
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                result = &mut connecting => {
                    return match result {
                        Ok(Ok((socket, _response))) => Ok(Some(socket)),
                        Ok(Err(e)) => Err(GatewayError::Transport(e)),
                        Err(_) => Err(GatewayError::ConnectTimeout(timeout)),
                    };
                }
                command = self.commands.recv() => {
                    if is_shutdown(command) {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Wait out the backoff; `false` means a stop was requested
    async fn sleep_or_shutdown(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = self.commands.recv() => {
                    if is_shutdown(command) {
                        return false;
                    }
                }
            }
        }
    }

    /// Drive one open socket until it has to go
    async fn drive(&mut self, socket: Socket) -> Outcome {
        let (sink, mut stream) = socket.split();
        let (outbound, outbound_rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        let mut writer = tokio::spawn(writer::run(sink, outbound_rx));

        let (zombie_tx, mut zombie_rx) = mpsc::channel(1);
        let (sequence_tx, sequence_rx) = watch::channel(self.machine.session().sequence());
        let mut heartbeat: Option<HeartbeatScheduler> = None;

        let hello_deadline = tokio::time::sleep(self.config.hello_timeout);
        tokio::pin!(hello_deadline);

        let outcome = loop {
            let awaiting_hello = self.machine.state() == ConnectionState::AwaitingHello;
            let actions = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::UpdatePresence(presence)) => {
                        self.send_presence(&outbound, presence).await;
                        continue;
                    }
                    Some(Command::Shutdown) | None => break Outcome::Shutdown,
                },
                Some(()) = zombie_rx.recv() => self.machine.handle_zombie(),
                () = &mut hello_deadline, if awaiting_hello => self.machine.handle_hello_timeout(),
                message = stream.next() => self.on_message(message),
            };

            sequence_tx.send_replace(self.machine.session().sequence());
            self.publish();

            let ctx = SocketContext {
                outbound: &outbound,
                sequence: &sequence_rx,
                zombie: &zombie_tx,
            };
            if let Some(outcome) = self.apply(actions, &ctx, &mut heartbeat).await {
                break outcome;
            }
        };

        // Heartbeats stop before anything else happens on this socket
        if let Some(scheduler) = heartbeat.take() {
            scheduler.cancel();
        }

        let code = match outcome {
            Outcome::Reconnect => CLOSE_RESUME,
            Outcome::Shutdown | Outcome::Terminated(_) => CLOSE_NORMAL,
        };
        let _ = outbound.try_send(Outbound::Close(code));
        drop(outbound);

        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
            tracing::debug!("Writer did not drain in time, aborting");
            writer.abort();
        }

        outcome
    }

    async fn apply(
        &mut self,
        actions: Vec<Action>,
        ctx: &SocketContext<'_>,
        heartbeat: &mut Option<HeartbeatScheduler>,
    ) -> Option<Outcome> {
        for action in actions {
            match action {
                Action::Send(frame) => {
                    if ctx.outbound.send(Outbound::Frame(frame)).await.is_err() {
                        self.machine.handle_transport_error("socket writer closed");
                        return Some(Outcome::Reconnect);
                    }
                }
                Action::StartHeartbeat(interval) => {
                    if let Some(previous) = heartbeat.take() {
                        previous.cancel();
                    }
                    *heartbeat = Some(HeartbeatScheduler::start(
                        interval,
                        ctx.outbound.clone(),
                        ctx.sequence.clone(),
                        ctx.zombie.clone(),
                    ));
                }
                Action::AckHeartbeat => {
                    if let Some(scheduler) = heartbeat.as_ref() {
                        scheduler.ack();
                    }
                }
                Action::HeartbeatNow => {
                    let frame = Frame::heartbeat(self.machine.session().sequence());
                    if ctx.outbound.send(Outbound::Frame(frame)).await.is_err() {
                        self.machine.handle_transport_error("socket writer closed");
                        return Some(Outcome::Reconnect);
                    }
                }
                Action::Dispatch(frame) => {
                    self.dispatcher.dispatch(frame);
                }
                Action::Disconnect(reason) => {
                    tracing::info!(reason = %reason, "Disconnecting from gateway");
                    self.publish();
                    return Some(Outcome::Reconnect);
                }
                Action::Terminate(error) => {
                    self.publish();
                    return Some(Outcome::Terminated(error));
                }
            }
        }
        None
    }

    fn on_message(&mut self, message: Option<Result<Message, WsError>>) -> Vec<Action> {
        match message {
            Some(Ok(Message::Text(text))) => self.on_payload(text.as_bytes()),
            Some(Ok(Message::Binary(bytes))) => self.on_payload(&bytes),
            Some(Ok(Message::Close(frame))) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                tracing::info!(
                    code = ?code,
                    reason = frame.as_ref().map_or("", |f| f.reason.as_ref()),
                    "Gateway closed the connection"
                );
                self.machine.handle_close(code)
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => Vec::new(),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "WebSocket error");
                self.machine.handle_transport_error(e.to_string())
            }
            None => {
                tracing::info!("Gateway stream ended without a close frame");
                self.machine.handle_close(None)
            }
        }
    }

    fn on_payload(&mut self, bytes: &[u8]) -> Vec<Action> {
        match codec::decode(bytes) {
            Ok(frame) => {
                tracing::trace!(op = %frame.op, seq = ?frame.s, event = ?frame.t, "Received frame");
                self.machine.handle_frame(frame)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                Vec::new()
            }
        }
    }

    async fn send_presence(&self, outbound: &mpsc::Sender<Outbound>, presence: PresenceUpdatePayload) {
        if self.machine.state() != ConnectionState::Connected {
            tracing::warn!(status = %presence.status, "Presence update dropped, session not ready");
            return;
        }
        let frame = Frame::presence_update(&presence);
        if outbound.send(Outbound::Frame(frame)).await.is_err() {
            tracing::debug!("Writer closed, presence update dropped");
        }
    }

    /// Push state and session to the shared views
    fn publish(&self) {
        let next = self.machine.state();
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        *self.session.write() = self.machine.session().snapshot();
    }
}

/// Per-socket channels handed to actions
struct SocketContext<'a> {
    outbound: &'a mpsc::Sender<Outbound>,
    sequence: &'a watch::Receiver<Option<u64>>,
    zombie: &'a mpsc::Sender<()>,
}

fn is_shutdown(command: Option<Command>) -> bool {
    match command {
        Some(Command::Shutdown) | None => true,
        Some(Command::UpdatePresence(presence)) => {
            tracing::warn!(status = %presence.status, "Presence update dropped, not connected");
            false
        }
    }
}
