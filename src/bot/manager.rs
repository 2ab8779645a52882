//! Plugin feature-flag state.
//!
//! A plugin is live in a chat when it is globally enabled AND not disabled
//! for that chat; the two axes are independent. State is hydrated from the
//! store once at startup and every toggle is write-through: persist first,
//! mutate second.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use crate::database::store::PluginFlagStore;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("plugin is already enabled")]
    AlreadyEnabled,

    #[error("plugin is not enabled")]
    NotEnabled,

    #[error("plugin is already disabled for this chat")]
    AlreadyDisabled,

    #[error("no such plugin")]
    UnknownPlugin,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// In-memory feature-flag cache with write-through persistence.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct PluginManager {
    store: Arc<dyn PluginFlagStore>,
    /// Names of all registered plugins; bound once after the registry is
    /// built and immutable afterwards.
    registered: Arc<OnceCell<HashSet<String>>>,
    enabled: Arc<RwLock<HashSet<String>>>,
    disabled_for_chat: Arc<DashMap<i64, HashSet<String>>>,
}

impl PluginManager {
    /// Hydrate the feature-flag state from the store. Called once at
    /// startup, before the plugin registry exists.
    pub async fn load(store: Arc<dyn PluginFlagStore>) -> anyhow::Result<Self> {
        let enabled: HashSet<String> = store.enabled_plugins().await?.into_iter().collect();

        let disabled_for_chat = DashMap::new();
        for (chat_id, names) in store.chat_disabled_plugins().await? {
            disabled_for_chat.insert(chat_id, names.into_iter().collect::<HashSet<_>>());
        }

        info!(
            "Feature flags loaded: {} plugin(s) enabled, chat overrides for {} chat(s)",
            enabled.len(),
            disabled_for_chat.len()
        );

        Ok(Self {
            store,
            registered: Arc::new(OnceCell::new()),
            enabled: Arc::new(RwLock::new(enabled)),
            disabled_for_chat: Arc::new(disabled_for_chat),
        })
    }

    /// Bind the set of registered plugin names. Must be called exactly once,
    /// right after the registry is built.
    pub fn bind_plugins<I>(&self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.registered
            .set(names.into_iter().collect())
            .expect("plugin registry already bound");
    }

    fn is_registered(&self, name: &str) -> bool {
        self.registered
            .get()
            .is_some_and(|names| names.contains(name))
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.enabled.read().contains(name)
    }

    pub fn is_plugin_disabled_for_chat(&self, chat_id: i64, name: &str) -> bool {
        self.disabled_for_chat
            .get(&chat_id)
            .is_some_and(|names| names.contains(name))
    }

    pub async fn enable_plugin(&self, name: &str) -> Result<(), ManagerError> {
        if self.is_plugin_enabled(name) {
            return Err(ManagerError::AlreadyEnabled);
        }
        if !self.is_registered(name) {
            return Err(ManagerError::UnknownPlugin);
        }

        self.store.set_enabled(name, true).await?;
        self.enabled.write().insert(name.to_string());
        Ok(())
    }

    pub async fn disable_plugin(&self, name: &str) -> Result<(), ManagerError> {
        if !self.is_plugin_enabled(name) {
            return Err(ManagerError::NotEnabled);
        }

        self.store.set_enabled(name, false).await?;
        self.enabled.write().remove(name);
        Ok(())
    }

    pub async fn enable_plugin_for_chat(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<(), ManagerError> {
        if !self.is_plugin_disabled_for_chat(chat_id, name) {
            return Err(ManagerError::AlreadyEnabled);
        }
        if !self.is_registered(name) {
            return Err(ManagerError::UnknownPlugin);
        }

        self.store.set_enabled_for_chat(chat_id, name, true).await?;
        if let Some(mut names) = self.disabled_for_chat.get_mut(&chat_id) {
            names.remove(name);
        }
        Ok(())
    }

    pub async fn disable_plugin_for_chat(
        &self,
        chat_id: i64,
        name: &str,
    ) -> Result<(), ManagerError> {
        if self.is_plugin_disabled_for_chat(chat_id, name) {
            return Err(ManagerError::AlreadyDisabled);
        }
        if !self.is_registered(name) {
            return Err(ManagerError::UnknownPlugin);
        }

        self.store
            .set_enabled_for_chat(chat_id, name, false)
            .await?;
        self.disabled_for_chat
            .entry(chat_id)
            .or_default()
            .insert(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::MemoryPluginStore;

    async fn manager_with(names: &[&str]) -> (PluginManager, Arc<MemoryPluginStore>) {
        let store = Arc::new(MemoryPluginStore::default());
        let manager = PluginManager::load(store.clone()).await.unwrap();
        manager.bind_plugins(names.iter().map(|n| n.to_string()));
        (manager, store)
    }

    #[tokio::test]
    async fn enable_twice_fails_but_stays_enabled() {
        let (manager, _) = manager_with(&["echo"]).await;

        manager.enable_plugin("echo").await.unwrap();
        assert!(manager.is_plugin_enabled("echo"));

        let err = manager.enable_plugin("echo").await.unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyEnabled));
        assert!(manager.is_plugin_enabled("echo"));
    }

    #[tokio::test]
    async fn disable_requires_enabled() {
        let (manager, _) = manager_with(&["echo"]).await;

        let err = manager.disable_plugin("echo").await.unwrap_err();
        assert!(matches!(err, ManagerError::NotEnabled));

        manager.enable_plugin("echo").await.unwrap();
        manager.disable_plugin("echo").await.unwrap();
        assert!(!manager.is_plugin_enabled("echo"));
    }

    #[tokio::test]
    async fn unknown_plugin_is_rejected() {
        let (manager, _) = manager_with(&["echo"]).await;

        let err = manager.enable_plugin("nope").await.unwrap_err();
        assert!(matches!(err, ManagerError::UnknownPlugin));

        let err = manager.disable_plugin_for_chat(-1, "nope").await.unwrap_err();
        assert!(matches!(err, ManagerError::UnknownPlugin));
    }

    #[tokio::test]
    async fn chat_flags_are_independent_of_global_flags() {
        let (manager, _) = manager_with(&["echo"]).await;
        manager.enable_plugin("echo").await.unwrap();

        manager.disable_plugin_for_chat(-5, "echo").await.unwrap();
        assert!(manager.is_plugin_disabled_for_chat(-5, "echo"));
        assert!(!manager.is_plugin_disabled_for_chat(-6, "echo"));
        // Global flag is untouched.
        assert!(manager.is_plugin_enabled("echo"));

        let err = manager
            .disable_plugin_for_chat(-5, "echo")
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyDisabled));

        manager.enable_plugin_for_chat(-5, "echo").await.unwrap();
        assert!(!manager.is_plugin_disabled_for_chat(-5, "echo"));

        let err = manager.enable_plugin_for_chat(-5, "echo").await.unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyEnabled));
    }

    #[tokio::test]
    async fn failed_persistence_leaves_flags_unchanged() {
        let (manager, store) = manager_with(&["echo"]).await;

        store.fail_writes();
        assert!(manager.enable_plugin("echo").await.is_err());
        assert!(!manager.is_plugin_enabled("echo"));

        store.succeed_writes();
        manager.enable_plugin("echo").await.unwrap();

        store.fail_writes();
        assert!(manager.disable_plugin_for_chat(-1, "echo").await.is_err());
        assert!(!manager.is_plugin_disabled_for_chat(-1, "echo"));
    }

    #[tokio::test]
    async fn hydrates_from_store_at_startup() {
        let store = Arc::new(MemoryPluginStore::default());
        store.seed_enabled("echo");
        store.seed_chat_disabled(-9, "echo");

        let manager = PluginManager::load(store).await.unwrap();
        assert!(manager.is_plugin_enabled("echo"));
        assert!(manager.is_plugin_disabled_for_chat(-9, "echo"));
    }
}
