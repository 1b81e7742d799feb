//! # cord-gateway
//!
//! Client for a chat platform's real-time WebSocket gateway.
//!
//! Keeps one session alive across network failures: identifies or resumes,
//! heartbeats, reconnects with backoff, and hands every dispatched event to the
//! listeners registered for its name.
//!
//! ```no_run
//! use cord_gateway::{Gateway, GatewayConfig, GatewayEventType};
//!
//! # async fn run() -> Result<(), cord_gateway::GatewayError> {
//! let mut gateway = Gateway::new(GatewayConfig::default());
//! gateway.on(GatewayEventType::MessageCreate, |event| async move {
//!     println!("message #{}", event.sequence);
//!     Ok(())
//! });
//! gateway.start("token")?;
//! gateway.wait().await
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod gateway;
pub mod heartbeat;
pub mod protocol;
pub mod session;

pub use config::{GatewayConfig, Identity};
pub use connection::{BackoffConfig, ConnectionState};
pub use dispatch::{DispatchEvent, ListenerHandle};
pub use error::{GatewayError, GatewayResult};
pub use events::GatewayEventType;
pub use gateway::{Gateway, GatewayHandle};
pub use protocol::{Frame, OpCode};
pub use session::{Session, SessionError, SessionSnapshot};
