//! Plugin management commands.
//!
//! `/enable` and `/disable` toggle plugins globally, `/enable_chat` and
//! `/disable_chat` toggle them for the chat the command was sent in. All
//! four are administrator-only. This plugin can never disable itself —
//! otherwise there would be no way back — and that guard is checked at both
//! the global and the per-chat enforcement point.

use tracing::error;
use uuid::Uuid;

use crate::bot::handler::{pattern, CommandContext, CommandHandler, Trigger};
use crate::bot::manager::{ManagerError, PluginManager};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};
use crate::utils::embed_correlation_id;

pub const NAME: &str = "manager";

pub struct ManagerPlugin {
    manager: PluginManager,
}

impl ManagerPlugin {
    pub fn new(manager: PluginManager) -> Self {
        Self { manager }
    }
}

impl Plugin for ManagerPlugin {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handlers(&self, me: &BotIdentity) -> Handlers {
        let username = &me.username;

        let enable = {
            let manager = self.manager.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(r"(?i)^/enable(?:@{username})? (.+)$"))),
                move |ctx| on_enable(manager.clone(), ctx),
            )
            .admin_only()
        };

        let disable = {
            let manager = self.manager.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(r"(?i)^/disable(?:@{username})? (.+)$"))),
                move |ctx| on_disable(manager.clone(), ctx),
            )
            .admin_only()
        };

        let enable_in_chat = {
            let manager = self.manager.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(
                    r"(?i)^/enable_chat(?:@{username})? (.+)$"
                ))),
                move |ctx| on_enable_in_chat(manager.clone(), ctx),
            )
            .admin_only()
        };

        let disable_in_chat = {
            let manager = self.manager.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(
                    r"(?i)^/disable_chat(?:@{username})? (.+)$"
                ))),
                move |ctx| on_disable_in_chat(manager.clone(), ctx),
            )
            .admin_only()
        };

        Handlers {
            commands: vec![enable, disable, enable_in_chat, disable_in_chat],
            ..Default::default()
        }
    }
}

async fn on_enable(manager: PluginManager, ctx: CommandContext) -> anyhow::Result<()> {
    let plugin_name = ctx.captures.get(1).to_string();

    match manager.enable_plugin(&plugin_name).await {
        Ok(()) => ctx.reply("✅ Plugin enabled").await,
        Err(ManagerError::AlreadyEnabled) => ctx.reply("💡 Plugin is already enabled").await,
        Err(ManagerError::UnknownPlugin) => ctx.reply("❌ Plugin does not exist").await,
        Err(err) => failure_reply(&ctx, &plugin_name, "Failed to enable plugin", err).await,
    }
}

async fn on_disable(manager: PluginManager, ctx: CommandContext) -> anyhow::Result<()> {
    let plugin_name = ctx.captures.get(1).to_string();

    if plugin_name == NAME {
        return ctx.reply("❌ The manager cannot be disabled.").await;
    }

    match manager.disable_plugin(&plugin_name).await {
        Ok(()) => ctx.reply("✅ Plugin disabled").await,
        Err(ManagerError::NotEnabled) => ctx.reply("💡 Plugin is not enabled").await,
        Err(err) => failure_reply(&ctx, &plugin_name, "Failed to disable plugin", err).await,
    }
}

async fn on_enable_in_chat(manager: PluginManager, ctx: CommandContext) -> anyhow::Result<()> {
    let plugin_name = ctx.captures.get(1).to_string();
    let chat_id = ctx.message.chat.id;

    match manager.enable_plugin_for_chat(chat_id, &plugin_name).await {
        Ok(()) => ctx.reply("✅ Plugin re-enabled for this chat").await,
        Err(ManagerError::AlreadyEnabled) => {
            ctx.reply("💡 Plugin is already enabled for this chat").await
        }
        Err(ManagerError::UnknownPlugin) => ctx.reply("❌ Plugin does not exist").await,
        Err(err) => {
            failure_reply(&ctx, &plugin_name, "Failed to enable plugin in chat", err).await
        }
    }
}

async fn on_disable_in_chat(manager: PluginManager, ctx: CommandContext) -> anyhow::Result<()> {
    let plugin_name = ctx.captures.get(1).to_string();
    let chat_id = ctx.message.chat.id;

    if plugin_name == NAME {
        return ctx.reply("❌ The manager cannot be disabled.").await;
    }

    match manager.disable_plugin_for_chat(chat_id, &plugin_name).await {
        Ok(()) => ctx.reply("✅ Plugin disabled for this chat").await,
        Err(ManagerError::AlreadyDisabled) => {
            ctx.reply("💡 Plugin is already disabled for this chat").await
        }
        Err(ManagerError::UnknownPlugin) => ctx.reply("❌ Plugin does not exist").await,
        Err(err) => {
            failure_reply(&ctx, &plugin_name, "Failed to disable plugin in chat", err).await
        }
    }
}

async fn failure_reply(
    ctx: &CommandContext,
    plugin_name: &str,
    message: &str,
    err: ManagerError,
) -> anyhow::Result<()> {
    let correlation_id = Uuid::new_v4().to_string();
    error!(
        correlation_id = %correlation_id,
        plugin = plugin_name,
        chat_id = ctx.message.chat.id,
        error = %err,
        "{message}"
    );
    ctx.reply(&format!(
        "❌ An error occurred.{}",
        embed_correlation_id(&correlation_id)
    ))
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::handler::Captures;
    use crate::bot::testing::{message_event, ApiCall, MemoryPluginStore, MockApi};

    async fn context(api: Arc<MockApi>, arg: &str) -> CommandContext {
        CommandContext {
            api,
            message: message_event(&format!("/x {arg}")),
            captures: Captures {
                matches: vec![format!("/x {arg}"), arg.to_string()],
                named: Default::default(),
            },
        }
    }

    async fn manager() -> PluginManager {
        let manager = PluginManager::load(Arc::new(MemoryPluginStore::default()))
            .await
            .unwrap();
        manager.bind_plugins([NAME.to_string(), "echo".to_string()]);
        manager
    }

    #[tokio::test]
    async fn manager_cannot_be_disabled_globally() {
        let api = Arc::new(MockApi::default());
        let manager = manager().await;
        manager.enable_plugin(NAME).await.unwrap();

        on_disable(manager.clone(), context(api.clone(), NAME).await)
            .await
            .unwrap();

        assert!(manager.is_plugin_enabled(NAME));
        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => {
                assert!(text.contains("cannot be disabled"));
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn manager_cannot_be_disabled_per_chat() {
        let api = Arc::new(MockApi::default());
        let manager = manager().await;

        on_disable_in_chat(manager.clone(), context(api.clone(), NAME).await)
            .await
            .unwrap();

        assert!(!manager.is_plugin_disabled_for_chat(2, NAME));
        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => {
                assert!(text.contains("cannot be disabled"));
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn enable_reports_distinct_outcomes() {
        let api = Arc::new(MockApi::default());
        let manager = manager().await;

        on_enable(manager.clone(), context(api.clone(), "echo").await)
            .await
            .unwrap();
        on_enable(manager.clone(), context(api.clone(), "echo").await)
            .await
            .unwrap();
        on_enable(manager.clone(), context(api.clone(), "ghost").await)
            .await
            .unwrap();

        let texts: Vec<String> = api
            .calls()
            .iter()
            .map(|call| match call {
                ApiCall::ReplyTo { text, .. } => text.clone(),
                other => panic!("unexpected call: {other:?}"),
            })
            .collect();

        assert!(texts[0].contains("Plugin enabled"));
        assert!(texts[1].contains("already enabled"));
        assert!(texts[2].contains("does not exist"));
    }
}
