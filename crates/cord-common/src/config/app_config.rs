//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use cord_core::Intents;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewaySettings,
    pub rest: RestConfig,
    pub bot: BotConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Initial well-known gateway endpoint
    #[serde(default = "default_gateway_url")]
    pub url: String,
    /// Gateway protocol version appended as `?v=`
    #[serde(default = "default_api_version")]
    pub api_version: u8,
    /// Intents sent in Identify
    #[serde(default)]
    pub intents: Intents,
    /// Client properties sent in Identify
    #[serde(default = "default_os")]
    pub os: String,
    #[serde(default = "default_browser")]
    pub browser: String,
    #[serde(default = "default_browser")]
    pub device: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long an open socket may wait for HELLO
    #[serde(default = "default_hello_timeout_ms")]
    pub hello_timeout_ms: u64,
    /// How long a dropped session stays worth resuming
    #[serde(default = "default_resume_window_secs")]
    pub resume_window_secs: u64,
    pub backoff: BackoffSettings,
    /// Queue between the read loop and the listener workers
    #[serde(default = "default_dispatch_buffer")]
    pub dispatch_buffer: usize,
    /// Listener invocations allowed to run at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_listeners: usize,
}

/// Reconnect backoff settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSettings {
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
    #[serde(default = "default_backoff_jitter_ms")]
    pub jitter_ms: u64,
}

/// REST API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_rest_base_url")]
    pub base_url: String,
    #[serde(default = "default_rest_timeout_secs")]
    pub timeout_secs: u64,
}

/// Bot identity and command settings
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

// Default value functions
fn default_app_name() -> String {
    "cord".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg".to_string()
}

fn default_api_version() -> u8 {
    10
}

fn default_os() -> String {
    env::consts::OS.to_string()
}

fn default_browser() -> String {
    "cord".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_hello_timeout_ms() -> u64 {
    10_000
}

fn default_resume_window_secs() -> u64 {
    120
}

fn default_dispatch_buffer() -> usize {
    1024
}

fn default_max_in_flight() -> usize {
    64
}

fn default_backoff_initial_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_backoff_jitter_ms() -> u64 {
    1_000
}

fn default_rest_base_url() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_rest_timeout_secs() -> u64 {
    15
}

fn default_prefix() -> String {
    "!".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an in-memory map of variables
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            app: AppSettings {
                name: vars.string_or("APP_NAME", default_app_name),
                env: vars.get("APP_ENV").and_then(|s| Environment::parse(&s)).unwrap_or_default(),
            },
            gateway: GatewaySettings {
                url: vars.string_or("GATEWAY_URL", default_gateway_url),
                api_version: vars.parse_or("GATEWAY_VERSION", default_api_version)?,
                intents: match vars.get("GATEWAY_INTENTS") {
                    Some(raw) => Intents::parse(&raw)
                        .map_err(|e| ConfigError::InvalidValue("GATEWAY_INTENTS", e.to_string()))?,
                    None => Intents::default(),
                },
                os: vars.string_or("GATEWAY_OS", default_os),
                browser: vars.string_or("GATEWAY_BROWSER", default_browser),
                device: vars.string_or("GATEWAY_DEVICE", default_browser),
                connect_timeout_ms: vars.parse_or("GATEWAY_CONNECT_TIMEOUT_MS", default_connect_timeout_ms)?,
                hello_timeout_ms: vars.parse_or("GATEWAY_HELLO_TIMEOUT_MS", default_hello_timeout_ms)?,
                resume_window_secs: vars.parse_or("GATEWAY_RESUME_WINDOW_SECS", default_resume_window_secs)?,
                backoff: BackoffSettings {
                    initial_ms: vars.parse_or("GATEWAY_RECONNECT_INITIAL_MS", default_backoff_initial_ms)?,
                    max_ms: vars.parse_or("GATEWAY_RECONNECT_MAX_MS", default_backoff_max_ms)?,
                    factor: vars.parse_or("GATEWAY_RECONNECT_FACTOR", default_backoff_factor)?,
                    jitter_ms: vars.parse_or("GATEWAY_RECONNECT_JITTER_MS", default_backoff_jitter_ms)?,
                },
                dispatch_buffer: vars.parse_or("GATEWAY_DISPATCH_BUFFER", default_dispatch_buffer)?,
                max_in_flight_listeners: vars.parse_or("GATEWAY_MAX_IN_FLIGHT", default_max_in_flight)?,
            },
            rest: RestConfig {
                base_url: vars.string_or("REST_BASE_URL", default_rest_base_url),
                timeout_secs: vars.parse_or("REST_TIMEOUT_SECS", default_rest_timeout_secs)?,
            },
            bot: BotConfig {
                token: vars
                    .get("DISCORD_TOKEN")
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?,
                prefix: vars.string_or("COMMAND_PREFIX", default_prefix),
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&'static str) -> Option<String>,
{
    fn get(&self, key: &'static str) -> Option<String> {
        (self.0)(key)
    }

    fn string_or(&self, key: &'static str, default: fn() -> String) -> String {
        self.get(key).unwrap_or_else(default)
    }

    fn parse_or<T>(&self, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue(key, e.to_string())),
            None => Ok(default()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
