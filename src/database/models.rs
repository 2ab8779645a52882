//! Document models for the MongoDB collections.

use serde::{Deserialize, Serialize};

/// A user on the allow-list (`allowed_users` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedUser {
    pub user_id: i64,
}

/// A chat on the allow-list (`allowed_chats` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedChat {
    pub chat_id: i64,
}

/// Global plugin flag (`plugins` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginFlag {
    pub name: String,
    pub enabled: bool,
}

/// Per-chat plugin flag (`chat_plugins` collection).
///
/// A document exists only while the plugin is disabled for the chat;
/// absence means "not disabled".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPluginFlag {
    pub chat_id: i64,
    pub plugin: String,
    pub enabled: bool,
}

/// A user the bot has seen (`users` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedUser {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    /// Unix timestamp of the last message seen from this user.
    pub last_seen: i64,
}

/// A user's membership in a chat (`chat_users` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMembership {
    pub chat_id: i64,
    pub user_id: i64,
    /// Unix timestamp of the last message seen from this member.
    pub last_seen: i64,
}
