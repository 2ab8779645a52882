//! In-memory fakes and event builders shared by the unit tests.

#![cfg(test)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::api::BotApi;
use super::event::{
    CallbackEvent, ChatKind, ChatRef, InlineQueryEvent, MessageEvent, Sender,
};
use crate::database::store::{ActivityStore, AllowStore, PluginFlagStore};

/// Everything a [`MockApi`] was asked to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    SendMessage {
        chat_id: i64,
        text: String,
    },
    SendMessageWithButton {
        chat_id: i64,
        text: String,
        button: String,
        data: String,
    },
    ReplyTo {
        chat_id: i64,
        message_id: i32,
        text: String,
    },
    AnswerCallback {
        query_id: String,
        text: String,
        show_alert: bool,
    },
    AckCallback {
        query_id: String,
    },
    AnswerInlineEmpty {
        query_id: String,
    },
    AnswerInlineArticle {
        query_id: String,
        title: String,
        text: String,
    },
    RemoveReplyMarkup {
        chat_id: i64,
        message_id: i32,
    },
}

/// Recording [`BotApi`] fake.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<ApiCall>>,
}

impl MockApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BotApi for MockApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.record(ApiCall::SendMessage {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_message_with_button(
        &self,
        chat_id: i64,
        text: &str,
        button_text: &str,
        callback_data: &str,
    ) -> anyhow::Result<()> {
        self.record(ApiCall::SendMessageWithButton {
            chat_id,
            text: text.to_string(),
            button: button_text.to_string(),
            data: callback_data.to_string(),
        });
        Ok(())
    }

    async fn reply_to(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()> {
        self.record(ApiCall::ReplyTo {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        text: &str,
        show_alert: bool,
    ) -> anyhow::Result<()> {
        self.record(ApiCall::AnswerCallback {
            query_id: query_id.to_string(),
            text: text.to_string(),
            show_alert,
        });
        Ok(())
    }

    async fn ack_callback(&self, query_id: &str) -> anyhow::Result<()> {
        self.record(ApiCall::AckCallback {
            query_id: query_id.to_string(),
        });
        Ok(())
    }

    async fn answer_inline_empty(&self, query_id: &str) -> anyhow::Result<()> {
        self.record(ApiCall::AnswerInlineEmpty {
            query_id: query_id.to_string(),
        });
        Ok(())
    }

    async fn answer_inline_article(
        &self,
        query_id: &str,
        title: &str,
        text: &str,
        _cache_time: u32,
    ) -> anyhow::Result<()> {
        self.record(ApiCall::AnswerInlineArticle {
            query_id: query_id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn remove_reply_markup(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()> {
        self.record(ApiCall::RemoveReplyMarkup {
            chat_id,
            message_id,
        });
        Ok(())
    }
}

fn store_down() -> anyhow::Error {
    anyhow::anyhow!("store down")
}

/// In-memory [`AllowStore`] with a failure switch.
#[derive(Default)]
pub struct MemoryAllowStore {
    pub users: Mutex<HashSet<i64>>,
    pub chats: Mutex<HashSet<i64>>,
    pub denied_users: Mutex<Vec<i64>>,
    fail: AtomicBool,
}

impl MemoryAllowStore {
    pub fn seed_user(&self, user_id: i64) {
        self.users.lock().unwrap().insert(user_id);
    }

    pub fn seed_chat(&self, chat_id: i64) {
        self.chats.lock().unwrap().insert(chat_id);
    }

    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn succeed_writes(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        Ok(())
    }
}

#[async_trait]
impl AllowStore for MemoryAllowStore {
    async fn all_allowed_users(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self.users.lock().unwrap().iter().copied().collect())
    }

    async fn all_allowed_chats(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self.chats.lock().unwrap().iter().copied().collect())
    }

    async fn allow_user(&self, user_id: i64) -> anyhow::Result<()> {
        self.check()?;
        self.users.lock().unwrap().insert(user_id);
        Ok(())
    }

    async fn deny_user(&self, user_id: i64) -> anyhow::Result<()> {
        self.check()?;
        self.denied_users.lock().unwrap().push(user_id);
        self.users.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn allow_chat(&self, chat_id: i64) -> anyhow::Result<()> {
        self.check()?;
        self.chats.lock().unwrap().insert(chat_id);
        Ok(())
    }

    async fn deny_chat(&self, chat_id: i64) -> anyhow::Result<()> {
        self.check()?;
        self.chats.lock().unwrap().remove(&chat_id);
        Ok(())
    }
}

/// In-memory [`PluginFlagStore`] with a failure switch.
#[derive(Default)]
pub struct MemoryPluginStore {
    pub enabled: Mutex<HashSet<String>>,
    pub chat_disabled: Mutex<HashMap<i64, HashSet<String>>>,
    fail: AtomicBool,
}

impl MemoryPluginStore {
    pub fn seed_enabled(&self, name: &str) {
        self.enabled.lock().unwrap().insert(name.to_string());
    }

    pub fn seed_chat_disabled(&self, chat_id: i64, name: &str) {
        self.chat_disabled
            .lock()
            .unwrap()
            .entry(chat_id)
            .or_default()
            .insert(name.to_string());
    }

    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn succeed_writes(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        Ok(())
    }
}

#[async_trait]
impl PluginFlagStore for MemoryPluginStore {
    async fn enabled_plugins(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.enabled.lock().unwrap().iter().cloned().collect())
    }

    async fn chat_disabled_plugins(&self) -> anyhow::Result<HashMap<i64, Vec<String>>> {
        Ok(self
            .chat_disabled
            .lock()
            .unwrap()
            .iter()
            .map(|(chat_id, names)| (*chat_id, names.iter().cloned().collect()))
            .collect())
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<()> {
        self.check()?;
        let mut set = self.enabled.lock().unwrap();
        if enabled {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
        Ok(())
    }

    async fn set_enabled_for_chat(
        &self,
        chat_id: i64,
        name: &str,
        enabled: bool,
    ) -> anyhow::Result<()> {
        self.check()?;
        let mut map = self.chat_disabled.lock().unwrap();
        if enabled {
            if let Some(names) = map.get_mut(&chat_id) {
                names.remove(name);
            }
        } else {
            map.entry(chat_id).or_default().insert(name.to_string());
        }
        Ok(())
    }
}

/// In-memory [`ActivityStore`] with a failure switch.
#[derive(Default)]
pub struct MemoryActivityStore {
    pub seen_users: Mutex<Vec<i64>>,
    pub memberships: Mutex<Vec<(i64, i64)>>,
    fail: AtomicBool,
}

impl MemoryActivityStore {
    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn record_user_seen(&self, user: &Sender) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        self.seen_users.lock().unwrap().push(user.id);
        Ok(())
    }

    async fn record_chat_membership(&self, chat_id: i64, user: &Sender) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        self.memberships.lock().unwrap().push((chat_id, user.id));
        Ok(())
    }
}

pub fn sender(id: i64) -> Sender {
    Sender {
        id,
        first_name: "Test".to_string(),
        last_name: None,
        username: Some("tester".to_string()),
        is_bot: false,
    }
}

/// A plain text message in a private chat, from user 2.
pub fn message_event(text: &str) -> MessageEvent {
    MessageEvent {
        id: 100,
        from: sender(2),
        chat: ChatRef {
            id: 2,
            kind: ChatKind::Private,
            title: None,
        },
        text: Some(text.to_string()),
        caption: None,
        edited: false,
        media: None,
        has_media: false,
        location: None,
        reply_to: None,
    }
}

/// A plain text message in a group chat.
pub fn group_message_event(chat_id: i64, user_id: i64, text: &str) -> MessageEvent {
    MessageEvent {
        id: 101,
        from: sender(user_id),
        chat: ChatRef {
            id: chat_id,
            kind: ChatKind::Supergroup,
            title: Some("Test Group".to_string()),
        },
        text: Some(text.to_string()),
        caption: None,
        edited: false,
        media: None,
        has_media: false,
        location: None,
        reply_to: None,
    }
}

/// A button press in a private chat, on a message sent `age` ago.
pub fn callback_event(user_id: i64, data: &str, age: Duration) -> CallbackEvent {
    CallbackEvent {
        id: "cbq1".to_string(),
        from: sender(user_id),
        chat: Some(ChatRef {
            id: user_id,
            kind: ChatKind::Private,
            title: None,
        }),
        message_id: Some(200),
        message_date: Some(Utc::now() - chrono::Duration::from_std(age).unwrap()),
        data: data.to_string(),
    }
}

pub fn inline_query_event(user_id: i64, query: &str) -> InlineQueryEvent {
    InlineQueryEvent {
        id: "iq1".to_string(),
        from: sender(user_id),
        query: query.to_string(),
    }
}

/// Poll until `cond` holds or a short deadline passes. Used to observe
/// fire-and-forget handler tasks.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Give fire-and-forget tasks a moment to run, for asserting that nothing
/// happened.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
