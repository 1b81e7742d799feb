//! Built-in commands

use super::{Command, CommandContext};
use async_trait::async_trait;
use cord_core::CreateMessage;
use std::fmt::Write;

/// `ping` → `Pong!`
#[derive(Debug, Clone, Copy)]
pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "Check that the bot is alive"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<Option<CreateMessage>> {
        Ok(Some(ctx.message.reply("Pong!")))
    }
}

/// `echo <text>` repeats the text
#[derive(Debug, Clone, Copy)]
pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Repeat the given text"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<Option<CreateMessage>> {
        if ctx.args.is_empty() {
            return Ok(Some(ctx.message.reply(format!("Usage: `{}echo <text>`", ctx.prefix))));
        }
        Ok(Some(CreateMessage::text(ctx.args)))
    }
}

/// `help` lists every registered command
#[derive(Debug, Clone, Copy)]
pub struct Help;

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "List available commands"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<Option<CreateMessage>> {
        let mut text = String::from("Commands:");
        for command in ctx.registry.iter() {
            write!(text, "\n`{}{}` - {}", ctx.prefix, command.name(), command.description())?;
        }
        Ok(Some(CreateMessage::text(text)))
    }
}
