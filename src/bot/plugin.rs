//! Plugin trait and startup-time registry.
//!
//! A plugin is a named, independently toggleable group of handlers. The
//! registry is assembled exactly once at startup — `handlers()` is called
//! one time per plugin with the bot's own identity so command patterns can
//! embed the username — and is immutable afterwards, so the dispatcher can
//! walk it without any synchronisation.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::handler::{CallbackHandler, CommandHandler, InlineHandler};

/// The bot's own identity, passed to plugins at registration.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// The handlers a plugin registers, grouped by event category.
#[derive(Default)]
pub struct Handlers {
    pub commands: Vec<CommandHandler>,
    pub callbacks: Vec<CallbackHandler>,
    pub inlines: Vec<InlineHandler>,
}

/// A named, independently toggleable feature module.
pub trait Plugin: Send + Sync {
    /// Unique, stable name; the feature-flag key and the log component.
    fn name(&self) -> &'static str;

    /// Called once at startup.
    fn handlers(&self, me: &BotIdentity) -> Handlers;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate plugin name '{0}'")]
    DuplicateName(String),
}

/// A plugin with its handlers resolved.
pub struct RegisteredPlugin {
    pub name: &'static str,
    pub handlers: Handlers,
}

/// Immutable, startup-assembled list of all plugins.
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PluginRegistry {
    pub fn build(
        plugins: Vec<Arc<dyn Plugin>>,
        me: &BotIdentity,
    ) -> Result<PluginRegistry, RegistryError> {
        let mut registered: Vec<RegisteredPlugin> = Vec::with_capacity(plugins.len());

        for (index, plugin) in plugins.iter().enumerate() {
            let name = plugin.name();
            if registered.iter().any(|existing| existing.name == name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }

            info!(
                "Registering plugin ({}/{}): {}",
                index + 1,
                plugins.len(),
                name
            );

            registered.push(RegisteredPlugin {
                name,
                handlers: plugin.handlers(me),
            });
        }

        Ok(PluginRegistry {
            plugins: registered,
        })
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> &[RegisteredPlugin] {
        &self.plugins
    }

    /// All registered plugin names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.plugins.iter().map(|p| p.name.to_string())
    }
}
