//! Event dispatcher
//!
//! The read loop hands Dispatch frames over a bounded queue and never waits for
//! listeners. A worker drains the queue and runs each listener as its own task,
//! in registration order, with at most `max_in_flight` running at once.

use super::registry::ListenerRegistry;
use crate::protocol::{Frame, OpCode};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// A dispatched event as listeners see it
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// Event name (`t`)
    pub name: String,
    /// Sequence number (`s`)
    pub sequence: u64,
    /// Raw event data (`d`)
    pub data: Value,
}

impl DispatchEvent {
    /// Convert a Dispatch frame; other op codes yield `None`
    #[must_use]
    pub fn from_frame(frame: Frame) -> Option<Self> {
        if frame.op != OpCode::Dispatch {
            return None;
        }
        Some(Self {
            name: frame.t?,
            sequence: frame.s?,
            data: frame.d,
        })
    }

    /// Parse the event data into a typed payload
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Configuration for the event dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Events buffered between the read loop and the worker
    pub queue_capacity: usize,
    /// Listener invocations allowed to run at once
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_in_flight: 64,
        }
    }
}

/// Event dispatcher bound to one gateway run
///
/// Dropping or shutting down the dispatcher stops the worker and aborts
/// listener invocations still in flight.
#[derive(Debug)]
pub struct EventDispatcher {
    registry: Arc<ListenerRegistry>,
    queue: mpsc::Sender<Arc<DispatchEvent>>,
    worker: JoinHandle<()>,
    dropped: AtomicU64,
}

impl EventDispatcher {
    /// Spawn the worker task
    #[must_use]
    pub fn spawn(registry: Arc<ListenerRegistry>, config: DispatcherConfig) -> Self {
        let (queue, rx) = mpsc::channel(config.queue_capacity.max(1));
        let semaphore = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        let worker = tokio::spawn(run(registry.clone(), rx, semaphore));

        tracing::debug!(
            queue_capacity = config.queue_capacity,
            max_in_flight = config.max_in_flight,
            "Event dispatcher started"
        );

        Self {
            registry,
            queue,
            worker,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a Dispatch frame without waiting
    ///
    /// Returns `true` if the event was queued. Events nobody listens to are
    /// skipped; a full queue drops the event with a warning.
    pub fn dispatch(&self, frame: Frame) -> bool {
        let Some(event) = DispatchEvent::from_frame(frame) else {
            tracing::debug!("Ignoring non-dispatch frame");
            return false;
        };

        if !self.registry.has_listeners(&event.name) {
            tracing::trace!(event = %event.name, seq = event.sequence, "No listeners");
            return false;
        }

        match self.queue.try_send(Arc::new(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    event = %event.name,
                    seq = event.sequence,
                    dropped_total = dropped,
                    "Dispatch queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(event = %event.name, "Dispatcher stopped, dropping event");
                false
            }
        }
    }

    /// Events dropped because the queue was full
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting events and wait for the worker to exit
    pub async fn shutdown(self) {
        let Self { queue, worker, .. } = self;
        drop(queue);
        if let Err(e) = worker.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Event dispatcher worker panicked");
            }
        }
        tracing::debug!("Event dispatcher stopped");
    }
}

async fn run(
    registry: Arc<ListenerRegistry>,
    mut queue: mpsc::Receiver<Arc<DispatchEvent>>,
    semaphore: Arc<Semaphore>,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            event = queue.recv() => match event {
                Some(event) => fan_out(&registry, &semaphore, &mut in_flight, event).await,
                None => break,
            },
        }
    }

    // Listener tasks do not outlive the gateway run
    in_flight.shutdown().await;
}

async fn fan_out(
    registry: &ListenerRegistry,
    semaphore: &Arc<Semaphore>,
    in_flight: &mut JoinSet<()>,
    event: Arc<DispatchEvent>,
) {
    for callback in registry.callbacks(&event.name) {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            return;
        };
        let event = event.clone();

        in_flight.spawn(async move {
            let _permit = permit;
            let name = event.name.clone();
            let sequence = event.sequence;

            match AssertUnwindSafe(async move { callback(event).await })
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(event = %name, seq = sequence, error = %e, "Listener failed");
                }
                Err(_) => {
                    tracing::error!(event = %name, seq = sequence, "Listener panicked");
                }
            }
        });
    }
}
