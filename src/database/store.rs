//! Persistence contracts the routing core depends on.
//!
//! The core never talks to MongoDB directly; it sees these three small
//! traits. The production implementations live in
//! [`repository`](super::repository), tests use in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::bot::event::Sender;

/// Durable allow-list of users and chats permitted to use the bot.
#[async_trait]
pub trait AllowStore: Send + Sync {
    async fn all_allowed_users(&self) -> anyhow::Result<Vec<i64>>;
    async fn all_allowed_chats(&self) -> anyhow::Result<Vec<i64>>;
    async fn allow_user(&self, user_id: i64) -> anyhow::Result<()>;
    async fn deny_user(&self, user_id: i64) -> anyhow::Result<()>;
    async fn allow_chat(&self, chat_id: i64) -> anyhow::Result<()>;
    async fn deny_chat(&self, chat_id: i64) -> anyhow::Result<()>;
}

/// Durable plugin feature-flag state.
#[async_trait]
pub trait PluginFlagStore: Send + Sync {
    /// Names of all globally enabled plugins.
    async fn enabled_plugins(&self) -> anyhow::Result<Vec<String>>;

    /// Per-chat disabled plugin names, keyed by chat id.
    async fn chat_disabled_plugins(&self) -> anyhow::Result<HashMap<i64, Vec<String>>>;

    async fn set_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<()>;

    async fn set_enabled_for_chat(
        &self,
        chat_id: i64,
        name: &str,
        enabled: bool,
    ) -> anyhow::Result<()>;
}

/// New-user / new-membership bookkeeping, invoked once per non-edited
/// message event.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record_user_seen(&self, user: &Sender) -> anyhow::Result<()>;
    async fn record_chat_membership(&self, chat_id: i64, user: &Sender) -> anyhow::Result<()>;
}
