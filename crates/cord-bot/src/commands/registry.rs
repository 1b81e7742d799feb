//! Static command registry

use super::{Command, Echo, Help, Ping};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable name → command table
///
/// Lookups are case-insensitive. Iteration is in name order.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn builder() -> CommandRegistryBuilder {
        CommandRegistryBuilder::default()
    }

    /// Registry with `ping`, `echo` and `help`
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::builder().command(Ping).command(Echo).command(Help).build()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name.to_ascii_lowercase().as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.commands.keys()).finish()
    }
}

/// Builder for [`CommandRegistry`]
#[derive(Default)]
pub struct CommandRegistryBuilder {
    commands: BTreeMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistryBuilder {
    /// Add a command; a later command with the same name replaces an earlier one
    #[must_use]
    pub fn command(mut self, command: impl Command + 'static) -> Self {
        let name = command.name();
        if self.commands.insert(name, Arc::new(command)).is_some() {
            tracing::warn!(command = name, "Command registered twice, keeping the last");
        }
        self
    }

    #[must_use]
    pub fn build(self) -> CommandRegistry {
        tracing::debug!(count = self.commands.len(), "Command registry built");
        CommandRegistry {
            commands: self.commands,
        }
    }
}
