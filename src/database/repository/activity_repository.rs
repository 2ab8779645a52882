//! User and membership bookkeeping with cache-first writes.
//!
//! Every non-edited message records its sender (and, in groups, the
//! membership). Recently recorded ids are short-circuited through a cache
//! so the per-message hot path skips redundant database writes.

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::bot::event::Sender;
use crate::cache::{CacheConfig, TypedCache};
use crate::database::models::{ChatMembership, TrackedUser};
use crate::database::store::ActivityStore;
use crate::database::Database;

/// MongoDB-backed [`ActivityStore`].
pub struct ActivityRepository {
    users: Collection<TrackedUser>,
    memberships: Collection<ChatMembership>,
    seen_users: TypedCache<i64, ()>,
    seen_members: TypedCache<(i64, i64), ()>,
}

impl ActivityRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
            memberships: db.collection("chat_users"),
            seen_users: TypedCache::new(CacheConfig::message_context()),
            seen_members: TypedCache::new(CacheConfig::message_context()),
        }
    }
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn record_user_seen(&self, user: &Sender) -> anyhow::Result<()> {
        if self.seen_users.contains(&user.id) {
            return Ok(());
        }

        let tracked = TrackedUser {
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            last_seen: Utc::now().timestamp(),
        };

        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.users
            .replace_one(doc! { "user_id": user.id }, &tracked)
            .with_options(options)
            .await?;

        self.seen_users.insert(user.id, ());
        debug!("Recorded user {} (@{:?})", user.id, user.username);
        Ok(())
    }

    async fn record_chat_membership(&self, chat_id: i64, user: &Sender) -> anyhow::Result<()> {
        // Keep the user record fresh as well.
        self.record_user_seen(user).await?;

        let key = (chat_id, user.id);
        if self.seen_members.contains(&key) {
            return Ok(());
        }

        let membership = ChatMembership {
            chat_id,
            user_id: user.id,
            last_seen: Utc::now().timestamp(),
        };

        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.memberships
            .replace_one(doc! { "chat_id": chat_id, "user_id": user.id }, &membership)
            .with_options(options)
            .await?;

        self.seen_members.insert(key, ());
        debug!("Recorded membership of user {} in chat {}", user.id, chat_id);
        Ok(())
    }
}
