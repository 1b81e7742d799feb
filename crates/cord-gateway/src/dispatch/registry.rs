//! Listener registry
//!
//! Event name to ordered list of callbacks. Registration order is invocation order.

use super::DispatchEvent;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Future returned by a listener
pub type ListenerFuture = BoxFuture<'static, anyhow::Result<()>>;

pub(crate) type Callback = Arc<dyn Fn(Arc<DispatchEvent>) -> ListenerFuture + Send + Sync>;

/// Token identifying one registration, used to remove it again
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    event: String,
    id: u64,
}

impl ListenerHandle {
    /// Event name the listener was registered for
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

#[derive(Clone)]
struct Listener {
    id: u64,
    callback: Callback,
}

/// Thread-safe registry of event listeners
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<String, Vec<Listener>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event name
    ///
    /// Registering the same closure twice yields two independent registrations.
    pub fn register<F, Fut>(&self, event: impl Into<String>, callback: F) -> ListenerHandle
    where
        F: Fn(Arc<DispatchEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event = event.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(move |e| -> ListenerFuture { Box::pin(callback(e)) });

        self.listeners
            .entry(event.clone())
            .or_default()
            .push(Listener { id, callback });

        tracing::debug!(event = %event, listener_id = id, "Listener registered");
        ListenerHandle { event, id }
    }

    /// Remove a registration
    ///
    /// Returns `false` if the handle was already removed. Invocations already
    /// started are not affected.
    pub fn unregister(&self, handle: &ListenerHandle) -> bool {
        let removed = match self.listeners.get_mut(&handle.event) {
            Some(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|l| l.id != handle.id);
                listeners.len() != before
            }
            None => false,
        };
        self.listeners
            .remove_if(&handle.event, |_, listeners| listeners.is_empty());

        if removed {
            tracing::debug!(event = %handle.event, listener_id = handle.id, "Listener removed");
        }
        removed
    }

    /// Snapshot of the callbacks for an event, in registration order
    pub(crate) fn callbacks(&self, event: &str) -> Vec<Callback> {
        self.listeners
            .get(event)
            .map(|listeners| listeners.iter().map(|l| l.callback.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of listeners registered for an event
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |l| l.len())
    }

    /// Check if an event has any listener
    #[must_use]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<(String, usize)> = self
            .listeners
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();
        f.debug_struct("ListenerRegistry").field("events", &events).finish()
    }
}
