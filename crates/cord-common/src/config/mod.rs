//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, BackoffSettings, BotConfig, ConfigError, Environment,
    GatewaySettings, RestConfig,
};
