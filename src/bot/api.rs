//! Outbound Telegram API surface.
//!
//! The dispatcher and the plugins talk to Telegram exclusively through the
//! [`BotApi`] trait; [`TelegramApi`] is the production implementation over a
//! throttled teloxide bot. Tests substitute a recording fake.

use async_trait::async_trait;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultArticle,
    InputMessageContent, InputMessageContentText, LinkPreviewOptions, MessageId, ParseMode,
    ReplyParameters,
};
use uuid::Uuid;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// How long Telegram may cache an empty/denial inline answer, in seconds.
pub const INLINE_FAILURE_CACHE_TIME: u32 = 2;

/// The messaging-platform operations the core and the plugins need.
///
/// All messages are sent as HTML, silently and without link previews.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;

    /// Send a message with a single inline button carrying callback data.
    async fn send_message_with_button(
        &self,
        chat_id: i64,
        text: &str,
        button_text: &str,
        callback_data: &str,
    ) -> anyhow::Result<()>;

    async fn reply_to(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()>;

    /// Answer a callback query with visible text.
    async fn answer_callback(
        &self,
        query_id: &str,
        text: &str,
        show_alert: bool,
    ) -> anyhow::Result<()>;

    /// Acknowledge a callback query without any visible effect.
    async fn ack_callback(&self, query_id: &str) -> anyhow::Result<()>;

    /// Answer an inline query with an empty, short-lived, personal result
    /// set. Used both for denials and for queries nothing matched.
    async fn answer_inline_empty(&self, query_id: &str) -> anyhow::Result<()>;

    /// Answer an inline query with a single text article.
    async fn answer_inline_article(
        &self,
        query_id: &str,
        title: &str,
        text: &str,
        cache_time: u32,
    ) -> anyhow::Result<()>;

    /// Strip the inline keyboard from a message.
    async fn remove_reply_markup(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()>;
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Production [`BotApi`] over teloxide.
#[derive(Clone)]
pub struct TelegramApi {
    bot: ThrottledBot,
}

impl TelegramApi {
    pub fn new(bot: ThrottledBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .disable_notification(true)
            .link_preview_options(no_preview())
            .await?;
        Ok(())
    }

    async fn send_message_with_button(
        &self,
        chat_id: i64,
        text: &str,
        button_text: &str,
        callback_data: &str,
    ) -> anyhow::Result<()> {
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            button_text.to_string(),
            callback_data.to_string(),
        )]]);

        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .disable_notification(true)
            .link_preview_options(no_preview())
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    async fn reply_to(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()> {
        let reply = ReplyParameters {
            allow_sending_without_reply: Some(true),
            ..ReplyParameters::new(MessageId(message_id))
        };

        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .disable_notification(true)
            .link_preview_options(no_preview())
            .reply_parameters(reply)
            .await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        text: &str,
        show_alert: bool,
    ) -> anyhow::Result<()> {
        self.bot
            .answer_callback_query(query_id.to_string())
            .text(text.to_string())
            .show_alert(show_alert)
            .await?;
        Ok(())
    }

    async fn ack_callback(&self, query_id: &str) -> anyhow::Result<()> {
        self.bot.answer_callback_query(query_id.to_string()).await?;
        Ok(())
    }

    async fn answer_inline_empty(&self, query_id: &str) -> anyhow::Result<()> {
        self.bot
            .answer_inline_query(query_id.to_string(), Vec::<InlineQueryResult>::new())
            .cache_time(INLINE_FAILURE_CACHE_TIME)
            .is_personal(true)
            .await?;
        Ok(())
    }

    async fn answer_inline_article(
        &self,
        query_id: &str,
        title: &str,
        text: &str,
        cache_time: u32,
    ) -> anyhow::Result<()> {
        let mut content = InputMessageContentText::new(text.to_string());
        content.parse_mode = Some(ParseMode::Html);
        content.link_preview_options = Some(no_preview());

        let article = InlineQueryResultArticle::new(
            Uuid::new_v4().to_string(),
            title.to_string(),
            InputMessageContent::Text(content),
        );

        self.bot
            .answer_inline_query(
                query_id.to_string(),
                vec![InlineQueryResult::Article(article)],
            )
            .cache_time(cache_time)
            .is_personal(true)
            .await?;
        Ok(())
    }

    async fn remove_reply_markup(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }
}
