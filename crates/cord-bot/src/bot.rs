//! Bot wiring and process lifecycle

use crate::commands::{parse_invocation, CommandContext, CommandRegistry};
use cord_common::{AppConfig, AppError, AppResult};
use cord_core::{CreateMessage, Message, Snowflake};
use cord_gateway::events::ReadyEvent;
use cord_gateway::{Gateway, GatewayConfig, GatewayError, GatewayEventType, ListenerHandle};
use cord_rest::RestClient;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Shared state behind the bot's listeners
#[derive(Debug)]
pub struct Bot {
    rest: RestClient,
    registry: CommandRegistry,
    prefix: String,
    self_id: OnceLock<Snowflake>,
}

impl Bot {
    #[must_use]
    pub fn new(rest: RestClient, registry: CommandRegistry, prefix: impl Into<String>) -> Self {
        Self {
            rest,
            registry,
            prefix: prefix.into(),
            self_id: OnceLock::new(),
        }
    }

    /// Record who we are so our own messages are never treated as commands
    pub fn on_ready(&self, ready: &ReadyEvent) {
        let _ = self.self_id.set(ready.user.id);
        info!(
            user_id = %ready.user.id,
            session_id = %ready.session_id,
            guilds = ready.guilds.len(),
            "Logged in as {}",
            ready.user.tag()
        );
    }

    /// Run the command a message invokes, if any, and return its reply
    pub async fn handle_message(&self, message: &Message) -> anyhow::Result<Option<CreateMessage>> {
        if message.author.bot || self.self_id.get() == Some(&message.author.id) {
            return Ok(None);
        }
        let Some(invocation) = parse_invocation(&self.prefix, &message.content) else {
            return Ok(None);
        };
        let Some(command) = self.registry.get(invocation.name) else {
            tracing::debug!(command = invocation.name, "Unknown command");
            return Ok(None);
        };

        info!(
            command = command.name(),
            channel_id = %message.channel_id,
            author = %message.author.tag(),
            "Running command"
        );
        let ctx = CommandContext {
            message,
            args: invocation.args,
            prefix: &self.prefix,
            registry: &self.registry,
        };
        command.execute(&ctx).await
    }

    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }
}

/// Register the READY and MESSAGE_CREATE listeners
pub fn install_listeners(gateway: &Gateway, bot: Arc<Bot>) -> Vec<ListenerHandle> {
    let ready_bot = bot.clone();
    let ready = gateway.on(GatewayEventType::Ready, move |event| {
        let bot = ready_bot.clone();
        async move {
            let ready: ReadyEvent = event.parse()?;
            bot.on_ready(&ready);
            Ok(())
        }
    });

    let messages = gateway.on(GatewayEventType::MessageCreate, move |event| {
        let bot = bot.clone();
        async move {
            let message: Message = event.parse()?;
            if let Some(reply) = bot.handle_message(&message).await? {
                bot.rest.send_message(message.channel_id, reply).await?;
            }
            Ok(())
        }
    });

    vec![ready, messages]
}

/// Run the bot until Ctrl-C or a terminal gateway error
pub async fn run(config: AppConfig) -> AppResult<()> {
    let rest = RestClient::new(&config.rest)
        .map_err(|e| AppError::Api(e.to_string()))?
        .with_token(config.bot.token.clone());
    let bot = Arc::new(Bot::new(
        rest,
        CommandRegistry::with_builtins(),
        config.bot.prefix.clone(),
    ));

    let mut gateway = Gateway::new(GatewayConfig::from(&config.gateway));
    install_listeners(&gateway, bot);

    gateway.start(config.bot.token.clone()).map_err(AppError::gateway)?;
    let handle = gateway.handle().map_err(AppError::gateway)?;

    let finished = tokio::select! {
        result = gateway.wait() => Some(result),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            None
        }
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Shutdown signal received");
            handle.shutdown().await;
            gateway.wait().await
        }
    };

    result.map_err(|e| match e {
        GatewayError::AuthenticationFailed => AppError::Authentication(e.to_string()),
        other => AppError::gateway(other),
    })
}
