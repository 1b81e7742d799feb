//! Gateway client configuration

use crate::connection::BackoffConfig;
use crate::protocol::IdentifyProperties;
use cord_common::GatewaySettings;
use cord_core::Intents;
use std::time::Duration;

/// What the client announces about itself in Identify
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub properties: IdentifyProperties,
    pub intents: Intents,
}

/// Gateway client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Well-known gateway endpoint used for fresh sessions
    pub url: String,
    /// Protocol version sent as `?v=`
    pub api_version: u8,
    pub identity: Identity,
    pub backoff: BackoffConfig,
    /// Upper bound on TCP/TLS/WebSocket establishment
    pub connect_timeout: Duration,
    /// How long an open socket may wait for the server's HELLO
    pub hello_timeout: Duration,
    /// How long after a drop the session is still worth resuming
    pub resume_window: Duration,
    /// Capacity of the queue between the read loop and the listeners
    pub dispatch_buffer: usize,
    /// Listener invocations allowed to run at once
    pub max_in_flight_listeners: usize,
    /// Capacity of the queue feeding the socket writer
    pub outbound_buffer: usize,
}

impl GatewayConfig {
    /// Default public gateway endpoint
    pub const DEFAULT_URL: &'static str = "wss://gateway.discord.gg";
    /// Default protocol version
    pub const DEFAULT_API_VERSION: u8 = 10;

    /// Create a configuration with defaults for the given endpoint
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.identity.intents = intents;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_hello_timeout(mut self, timeout: Duration) -> Self {
        self.hello_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_resume_window(mut self, window: Duration) -> Self {
        self.resume_window = window;
        self
    }

    /// Build the socket URL for an endpoint, adding version and encoding
    ///
    /// Endpoints that already carry a query string are used as-is.
    #[must_use]
    pub fn connect_url(&self, base: &str) -> String {
        if base.contains('?') {
            return base.to_string();
        }
        format!(
            "{}/?v={}&encoding=json",
            base.trim_end_matches('/'),
            self.api_version
        )
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            api_version: Self::DEFAULT_API_VERSION,
            identity: Identity::default(),
            backoff: BackoffConfig::default(),
            connect_timeout: Duration::from_secs(10),
            hello_timeout: Duration::from_secs(10),
            resume_window: Duration::from_secs(120),
            dispatch_buffer: 1024,
            max_in_flight_listeners: 64,
            outbound_buffer: 64,
        }
    }
}

impl From<&GatewaySettings> for GatewayConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            url: settings.url.clone(),
            api_version: settings.api_version,
            identity: Identity {
                properties: IdentifyProperties::new(settings.browser.clone())
                    .with_os(settings.os.clone())
                    .with_device(settings.device.clone()),
                intents: settings.intents,
            },
            backoff: BackoffConfig {
                initial: Duration::from_millis(settings.backoff.initial_ms),
                max: Duration::from_millis(settings.backoff.max_ms),
                factor: settings.backoff.factor,
                jitter: Duration::from_millis(settings.backoff.jitter_ms),
            },
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            hello_timeout: Duration::from_millis(settings.hello_timeout_ms),
            resume_window: Duration::from_secs(settings.resume_window_secs),
            dispatch_buffer: settings.dispatch_buffer.max(1),
            max_in_flight_listeners: settings.max_in_flight_listeners.max(1),
            ..Self::default()
        }
    }
}
