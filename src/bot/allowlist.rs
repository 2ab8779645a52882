//! Allow-list access control.
//!
//! Whoever is not on the allow-list does not exist as far as the bot is
//! concerned. The list is held in memory for lock-free-ish reads on every
//! event and written through to the store on every mutation: persist first,
//! mutate second, so a failed persistence call leaves the cache untouched.
//!
//! User ids and chat ids live in separate sets. Telegram happens to keep
//! the two id spaces disjoint, but nothing here needs to rely on that.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use crate::database::store::AllowStore;

#[derive(Debug, Error)]
pub enum AllowError {
    /// The bot administrator can never be denied.
    #[error("the bot administrator cannot be denied")]
    Administrator,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// In-memory allow-list with write-through persistence.
///
/// Cloning is cheap; clones share the same sets.
#[derive(Clone)]
pub struct AllowList {
    admin_id: i64,
    store: Arc<dyn AllowStore>,
    users: Arc<RwLock<HashSet<i64>>>,
    chats: Arc<RwLock<HashSet<i64>>>,
}

impl AllowList {
    /// Hydrate the allow-list from the store. Called once at startup.
    pub async fn load(admin_id: i64, store: Arc<dyn AllowStore>) -> anyhow::Result<Self> {
        let users: HashSet<i64> = store.all_allowed_users().await?.into_iter().collect();
        let chats: HashSet<i64> = store.all_allowed_chats().await?.into_iter().collect();

        info!(
            "Allow-list loaded: {} user(s), {} chat(s)",
            users.len(),
            chats.len()
        );

        Ok(Self {
            admin_id,
            store,
            users: Arc::new(RwLock::new(users)),
            chats: Arc::new(RwLock::new(chats)),
        })
    }

    /// True if this user is the bot administrator.
    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_id
    }

    /// The administrator is implicitly allowed.
    pub fn is_user_allowed(&self, user_id: i64) -> bool {
        self.is_admin(user_id) || self.users.read().contains(&user_id)
    }

    pub fn is_chat_allowed(&self, chat_id: i64) -> bool {
        self.chats.read().contains(&chat_id)
    }

    pub async fn allow_user(&self, user_id: i64) -> Result<(), AllowError> {
        self.store.allow_user(user_id).await?;
        self.users.write().insert(user_id);
        Ok(())
    }

    pub async fn deny_user(&self, user_id: i64) -> Result<(), AllowError> {
        if self.is_admin(user_id) {
            return Err(AllowError::Administrator);
        }

        self.store.deny_user(user_id).await?;
        self.users.write().remove(&user_id);
        Ok(())
    }

    pub async fn allow_chat(&self, chat_id: i64) -> Result<(), AllowError> {
        self.store.allow_chat(chat_id).await?;
        self.chats.write().insert(chat_id);
        Ok(())
    }

    pub async fn deny_chat(&self, chat_id: i64) -> Result<(), AllowError> {
        self.store.deny_chat(chat_id).await?;
        self.chats.write().remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::MemoryAllowStore;

    const ADMIN: i64 = 1000;

    async fn allowlist(store: Arc<MemoryAllowStore>) -> AllowList {
        AllowList::load(ADMIN, store).await.unwrap()
    }

    #[tokio::test]
    async fn administrator_is_implicitly_allowed() {
        let list = allowlist(Arc::new(MemoryAllowStore::default())).await;
        assert!(list.is_user_allowed(ADMIN));
        assert!(!list.is_user_allowed(2));
    }

    #[tokio::test]
    async fn deny_administrator_fails_without_mutation() {
        let store = Arc::new(MemoryAllowStore::default());
        let list = allowlist(store.clone()).await;

        let err = list.deny_user(ADMIN).await.unwrap_err();
        assert!(matches!(err, AllowError::Administrator));
        assert!(list.is_user_allowed(ADMIN));
        // The store never saw the deny either.
        assert!(store.denied_users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn allow_then_deny_user_round_trip() {
        let list = allowlist(Arc::new(MemoryAllowStore::default())).await;

        list.allow_user(5).await.unwrap();
        assert!(list.is_user_allowed(5));

        list.deny_user(5).await.unwrap();
        assert!(!list.is_user_allowed(5));
    }

    #[tokio::test]
    async fn chat_sets_are_independent_of_user_sets() {
        let list = allowlist(Arc::new(MemoryAllowStore::default())).await;

        list.allow_chat(-42).await.unwrap();
        assert!(list.is_chat_allowed(-42));
        assert!(!list.is_user_allowed(-42));

        list.deny_chat(-42).await.unwrap();
        assert!(!list.is_chat_allowed(-42));
    }

    #[tokio::test]
    async fn failed_persistence_leaves_cache_unchanged() {
        let store = Arc::new(MemoryAllowStore::default());
        let list = allowlist(store.clone()).await;

        store.fail_writes();
        assert!(list.allow_user(9).await.is_err());
        assert!(!list.is_user_allowed(9));

        store.succeed_writes();
        list.allow_user(9).await.unwrap();

        store.fail_writes();
        assert!(list.deny_user(9).await.is_err());
        assert!(list.is_user_allowed(9));
    }

    #[tokio::test]
    async fn hydrates_from_store_at_startup() {
        let store = Arc::new(MemoryAllowStore::default());
        store.seed_user(77);
        store.seed_chat(-77);

        let list = allowlist(store).await;
        assert!(list.is_user_allowed(77));
        assert!(list.is_chat_allowed(-77));
    }

    #[tokio::test]
    async fn concurrent_reads_and_writes_do_not_corrupt() {
        let list = allowlist(Arc::new(MemoryAllowStore::default())).await;

        let mut tasks = Vec::new();
        for i in 0..64 {
            let writer = list.clone();
            tasks.push(tokio::spawn(async move {
                writer.allow_user(i).await.unwrap();
            }));

            let reader = list.clone();
            tasks.push(tokio::spawn(async move {
                // Must never observe a torn set; the answer itself may be
                // either way depending on interleaving.
                let _ = reader.is_user_allowed(i);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        for i in 0..64 {
            assert!(list.is_user_allowed(i));
        }
    }
}
