//! Public gateway client

use crate::config::GatewayConfig;
use crate::connection::{Command, ConnectionState, Runner};
use crate::dispatch::{DispatchEvent, DispatcherConfig, EventDispatcher, ListenerHandle, ListenerRegistry};
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::protocol::PresenceUpdatePayload;
use crate::session::SessionSnapshot;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 16;

/// Gateway client
///
/// Listeners can be added and removed at any time, before or after
/// [`start`](Self::start). One `start` runs until [`stop`](Self::stop) or a
/// terminal close; after that the client can be started again.
pub struct Gateway {
    config: GatewayConfig,
    registry: Arc<ListenerRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Arc<RwLock<SessionSnapshot>>,
    running: Option<Running>,
}

struct Running {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<GatewayResult<()>>,
}

impl Gateway {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            registry: Arc::new(ListenerRegistry::new()),
            state: Arc::new(state),
            session: Arc::new(RwLock::new(SessionSnapshot::default())),
            running: None,
        }
    }

    /// Register a listener for an event name
    ///
    /// Listeners run on their own task; a listener that errors or panics is
    /// logged and does not affect other listeners or the connection.
    pub fn on<F, Fut>(&self, event: impl Into<String>, listener: F) -> ListenerHandle
    where
        F: Fn(Arc<DispatchEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event = event.into();
        let intents = self.config.identity.intents;
        if GatewayEventType::parse(&event).is_some_and(|known| !known.is_delivered_with(intents)) {
            tracing::warn!(
                event = %event,
                intents = intents.bits(),
                "Listener registered for an event the configured intents will not deliver"
            );
        }
        self.registry.register(event, listener)
    }

    /// Remove a listener; returns `false` if it was already removed
    pub fn off(&self, handle: &ListenerHandle) -> bool {
        self.registry.unregister(handle)
    }

    /// Connect and keep the session alive in the background
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`GatewayError::AlreadyRunning`] if a previous start is still active
    pub fn start(&mut self, token: impl Into<String>) -> GatewayResult<()> {
        if self.running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return Err(GatewayError::AlreadyRunning);
        }
        if let Some(Err(e)) = self.reap_finished() {
            tracing::warn!(error = %e, "Previous run ended with an error nobody waited for");
        }

        let dispatcher = EventDispatcher::spawn(
            self.registry.clone(),
            DispatcherConfig {
                queue_capacity: self.config.dispatch_buffer,
                max_in_flight: self.config.max_in_flight_listeners,
            },
        );

        let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let runner = Runner::new(
            self.config.clone(),
            token.into(),
            dispatcher,
            commands_rx,
            self.state.clone(),
            self.session.clone(),
        );

        tracing::info!(url = %self.config.url, "Starting gateway");
        let task = tokio::spawn(runner.run());
        self.running = Some(Running { commands, task });
        Ok(())
    }

    /// Close the socket with code 1000 and wait for the background task to end
    ///
    /// # Errors
    /// Returns [`GatewayError::NotRunning`] if the gateway was never started or
    /// its outcome was already taken; otherwise the outcome of the run.
    pub async fn stop(&mut self) -> GatewayResult<()> {
        let running = self.running.as_ref().ok_or(GatewayError::NotRunning)?;
        // The runner may already be gone after a terminal close
        let _ = running.commands.send(Command::Shutdown).await;
        self.wait().await
    }

    /// Wait for the run to end and take its outcome
    ///
    /// Resolves with `Ok(())` after [`stop`](Self::stop) and with the terminal
    /// error after a non-recoverable close. The outcome is handed out once.
    /// Cancelling this future leaves the run untouched.
    ///
    /// # Errors
    /// The terminal error of the run, or [`GatewayError::NotRunning`]
    pub async fn wait(&mut self) -> GatewayResult<()> {
        let running = self.running.as_mut().ok_or(GatewayError::NotRunning)?;
        let joined = (&mut running.task).await;
        self.running = None;

        match joined {
            Ok(result) => result,
            Err(e) => Err(GatewayError::Task(e.to_string())),
        }
    }

    /// Take the outcome of a run that already ended without being waited on
    fn reap_finished(&mut self) -> Option<GatewayResult<()>> {
        let mut task = self.running.take()?.task;
        match (&mut task).now_or_never() {
            Some(Ok(result)) => Some(result),
            Some(Err(e)) => Some(Err(GatewayError::Task(e.to_string()))),
            None => {
                task.abort();
                None
            }
        }
    }

    /// Cheap handle for stopping or updating presence while another task waits
    ///
    /// # Errors
    /// Returns [`GatewayError::NotRunning`] if the gateway is not started
    pub fn handle(&self) -> GatewayResult<GatewayHandle> {
        let running = self.running.as_ref().ok_or(GatewayError::NotRunning)?;
        Ok(GatewayHandle {
            commands: running.commands.clone(),
        })
    }

    /// Send a presence update (op 3) once the session is connected
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidPresence`] for unknown statuses and
    /// [`GatewayError::NotRunning`] if the gateway is not started
    pub async fn update_presence(&self, status: impl Into<String>) -> GatewayResult<()> {
        self.handle()?.update_presence(status).await
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current session
    #[must_use]
    pub fn session(&self) -> SessionSnapshot {
        self.session.read().clone()
    }

    /// Check if a run is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Clonable control handle for a running gateway
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<Command>,
}

impl GatewayHandle {
    /// Ask the gateway to close with code 1000 and stop
    ///
    /// Use [`Gateway::wait`] to observe completion.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    /// Send a presence update (op 3) once the session is connected
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidPresence`] for unknown statuses and
    /// [`GatewayError::NotRunning`] if the run already ended
    pub async fn update_presence(&self, status: impl Into<String>) -> GatewayResult<()> {
        let presence = PresenceUpdatePayload::new(status);
        if !presence.is_valid_status() {
            return Err(GatewayError::InvalidPresence(presence.status));
        }
        self.commands
            .send(Command::UpdatePresence(presence))
            .await
            .map_err(|_| GatewayError::NotRunning)
    }
}
