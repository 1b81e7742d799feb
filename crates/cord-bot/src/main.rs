//! Bot entry point
//!
//! Run with:
//! ```bash
//! DISCORD_TOKEN=... cargo run -p cord-bot
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use cord_common::{try_init_tracing, try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            if let Err(te) = try_init_tracing() {
                eprintln!("Warning: Failed to initialize tracing: {te}");
            }
            error!(error = %e, "Failed to load configuration");
            std::process::exit(cord_common::AppError::from(e).exit_code());
        }
    };

    let tracing_config = if config.app.env.is_production() {
        TracingConfig::production()
    } else {
        TracingConfig::development()
    };
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(env = ?config.app.env, prefix = %config.bot.prefix, "Configuration loaded");

    if let Err(e) = cord_bot::run(config).await {
        error!(error = %e, "Bot stopped with an error");
        std::process::exit(e.exit_code());
    }
}
