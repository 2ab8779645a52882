//! Allow-list repository.

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::{AllowedChat, AllowedUser};
use crate::database::store::AllowStore;
use crate::database::Database;

/// MongoDB-backed [`AllowStore`].
pub struct AllowRepository {
    users: Collection<AllowedUser>,
    chats: Collection<AllowedChat>,
}

impl AllowRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("allowed_users"),
            chats: db.collection("allowed_chats"),
        }
    }
}

#[async_trait]
impl AllowStore for AllowRepository {
    async fn all_allowed_users(&self) -> anyhow::Result<Vec<i64>> {
        let mut cursor = self.users.find(doc! {}).await?;
        let mut ids = Vec::new();

        while let Some(entry) = cursor.next().await {
            ids.push(entry?.user_id);
        }
        Ok(ids)
    }

    async fn all_allowed_chats(&self) -> anyhow::Result<Vec<i64>> {
        let mut cursor = self.chats.find(doc! {}).await?;
        let mut ids = Vec::new();

        while let Some(entry) = cursor.next().await {
            ids.push(entry?.chat_id);
        }
        Ok(ids)
    }

    async fn allow_user(&self, user_id: i64) -> anyhow::Result<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.users
            .replace_one(doc! { "user_id": user_id }, &AllowedUser { user_id })
            .with_options(options)
            .await?;

        debug!("Allowed user {}", user_id);
        Ok(())
    }

    async fn deny_user(&self, user_id: i64) -> anyhow::Result<()> {
        self.users.delete_one(doc! { "user_id": user_id }).await?;
        debug!("Denied user {}", user_id);
        Ok(())
    }

    async fn allow_chat(&self, chat_id: i64) -> anyhow::Result<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.chats
            .replace_one(doc! { "chat_id": chat_id }, &AllowedChat { chat_id })
            .with_options(options)
            .await?;

        debug!("Allowed chat {}", chat_id);
        Ok(())
    }

    async fn deny_chat(&self, chat_id: i64) -> anyhow::Result<()> {
        self.chats.delete_one(doc! { "chat_id": chat_id }).await?;
        debug!("Denied chat {}", chat_id);
        Ok(())
    }
}
