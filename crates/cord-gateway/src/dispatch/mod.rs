//! Event dispatch
//!
//! Routes Dispatch frames to the listeners registered for their event name.

mod dispatcher;
mod registry;

pub use dispatcher::{DispatchEvent, DispatcherConfig, EventDispatcher};
pub use registry::{ListenerFuture, ListenerHandle, ListenerRegistry};
