//! Plugin feature-flag repository.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::{ChatPluginFlag, PluginFlag};
use crate::database::store::PluginFlagStore;
use crate::database::Database;

/// MongoDB-backed [`PluginFlagStore`].
pub struct PluginRepository {
    plugins: Collection<PluginFlag>,
    chat_plugins: Collection<ChatPluginFlag>,
}

impl PluginRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            plugins: db.collection("plugins"),
            chat_plugins: db.collection("chat_plugins"),
        }
    }
}

#[async_trait]
impl PluginFlagStore for PluginRepository {
    async fn enabled_plugins(&self) -> anyhow::Result<Vec<String>> {
        let mut cursor = self.plugins.find(doc! { "enabled": true }).await?;
        let mut names = Vec::new();

        while let Some(entry) = cursor.next().await {
            names.push(entry?.name);
        }
        Ok(names)
    }

    async fn chat_disabled_plugins(&self) -> anyhow::Result<HashMap<i64, Vec<String>>> {
        let mut cursor = self.chat_plugins.find(doc! { "enabled": false }).await?;
        let mut disabled: HashMap<i64, Vec<String>> = HashMap::new();

        while let Some(entry) = cursor.next().await {
            let flag = entry?;
            disabled.entry(flag.chat_id).or_default().push(flag.plugin);
        }
        Ok(disabled)
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.plugins
            .replace_one(
                doc! { "name": name },
                &PluginFlag {
                    name: name.to_string(),
                    enabled,
                },
            )
            .with_options(options)
            .await?;

        debug!("Set plugin '{}' enabled={}", name, enabled);
        Ok(())
    }

    async fn set_enabled_for_chat(
        &self,
        chat_id: i64,
        name: &str,
        enabled: bool,
    ) -> anyhow::Result<()> {
        if enabled {
            // Re-enabling removes the disable marker.
            self.chat_plugins
                .delete_one(doc! { "chat_id": chat_id, "plugin": name })
                .await?;
        } else {
            let options = mongodb::options::ReplaceOptions::builder()
                .upsert(true)
                .build();

            self.chat_plugins
                .replace_one(
                    doc! { "chat_id": chat_id, "plugin": name },
                    &ChatPluginFlag {
                        chat_id,
                        plugin: name.to_string(),
                        enabled: false,
                    },
                )
                .with_options(options)
                .await?;
        }

        debug!(
            "Set plugin '{}' enabled={} for chat {}",
            name, enabled, chat_id
        );
        Ok(())
    }
}
