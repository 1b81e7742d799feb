//! Prefix commands
//!
//! The registry is built once at startup and never changes afterwards.
//! A message such as `!echo hello world` is split into the command name
//! (`echo`) and its raw argument string (`hello world`).

mod builtin;
mod registry;

pub use builtin::{Echo, Help, Ping};
pub use registry::{CommandRegistry, CommandRegistryBuilder};

use async_trait::async_trait;
use cord_core::{CreateMessage, Message};

/// A named command
#[async_trait]
pub trait Command: Send + Sync {
    /// Name typed after the prefix, lowercase
    fn name(&self) -> &'static str;

    /// One-line description for `help`
    fn description(&self) -> &'static str;

    /// Run the command; `Some` is sent back to the channel as a reply
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<Option<CreateMessage>>;
}

/// Everything a command can see about its invocation
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub message: &'a Message,
    pub args: &'a str,
    pub prefix: &'a str,
    pub registry: &'a CommandRegistry,
}

/// A parsed `<prefix><name> <args>` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Split a message into command name and arguments
///
/// Returns `None` when the content does not start with `prefix`, when the
/// prefix is empty, or when no name follows it.
pub fn parse_invocation<'a>(prefix: &str, content: &'a str) -> Option<Invocation<'a>> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some(Invocation { name, args })
}
