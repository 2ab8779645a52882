//! Platform-neutral event model.
//!
//! Every Telegram update the bot cares about is converted into one of these
//! value types before it reaches the dispatcher. They are constructed once
//! per update, never mutated, and carry only the data the routing core and
//! the plugins need, which keeps the dispatcher testable without building
//! full Telegram payloads.

use chrono::{DateTime, Utc};
use teloxide::types::{MaybeInaccessibleMessage, Message};

/// The sender of a message, callback or inline query.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    fn from_user(user: &teloxide::types::User) -> Self {
        Self {
            id: user.id.0 as i64,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            is_bot: user.is_bot,
        }
    }

    /// Full display name ("First Last" or just "First").
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// What kind of chat an event originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// The chat an event originated in.
#[derive(Debug, Clone)]
pub struct ChatRef {
    pub id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
}

impl ChatRef {
    fn from_chat(chat: &teloxide::types::Chat) -> Self {
        let kind = if chat.is_private() {
            ChatKind::Private
        } else if chat.is_group() {
            ChatKind::Group
        } else if chat.is_supergroup() {
            ChatKind::Supergroup
        } else {
            ChatKind::Channel
        };

        Self {
            id: chat.id.0,
            kind,
            title: chat.title().map(str::to_owned),
        }
    }

    /// True for groups and supergroups.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }
}

/// Media classification of a message, used by media triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTag {
    Photo,
    Document,
    Sticker,
    Animation,
    Voice,
    Location,
    Venue,
}

/// Geographic coordinates attached to a location or venue message.
#[derive(Debug, Clone, Copy)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// The sender of the message a command replied to.
#[derive(Debug, Clone)]
pub struct ReplyRef {
    pub sender: Sender,
}

/// A text or media message, possibly an edit of an earlier one.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub id: i32,
    pub from: Sender,
    pub chat: ChatRef,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub edited: bool,
    /// Primary media classification, if any.
    pub media: Option<MediaTag>,
    /// True if the message carries any media at all, including kinds
    /// without their own tag (audio, video, video notes).
    pub has_media: bool,
    pub location: Option<GeoPoint>,
    pub reply_to: Option<ReplyRef>,
}

impl MessageEvent {
    /// Caption-or-text, the string command triggers are matched against.
    pub fn effective_text(&self) -> &str {
        match (&self.caption, &self.text) {
            (Some(caption), _) if !caption.is_empty() => caption,
            (_, Some(text)) => text,
            _ => "",
        }
    }

    /// Convert a Telegram message. Returns `None` for updates the routing
    /// core ignores: messages without a sender (channel posts) and service
    /// messages (joins, leaves, title or photo changes, pins).
    pub fn from_telegram(msg: &Message, edited: bool) -> Option<Self> {
        let from = msg.from.as_ref()?;

        if msg.new_chat_members().is_some()
            || msg.left_chat_member().is_some()
            || msg.new_chat_title().is_some()
            || msg.new_chat_photo().is_some()
            || msg.pinned_message().is_some()
        {
            return None;
        }

        let media = if msg.photo().is_some() {
            Some(MediaTag::Photo)
        } else if msg.document().is_some() {
            Some(MediaTag::Document)
        } else if msg.sticker().is_some() {
            Some(MediaTag::Sticker)
        } else if msg.animation().is_some() {
            Some(MediaTag::Animation)
        } else if msg.voice().is_some() {
            Some(MediaTag::Voice)
        } else if msg.venue().is_some() {
            // Venue before location: venue messages carry both.
            Some(MediaTag::Venue)
        } else if msg.location().is_some() {
            Some(MediaTag::Location)
        } else {
            None
        };

        let has_media = media.is_some()
            || msg.audio().is_some()
            || msg.video().is_some()
            || msg.video_note().is_some();

        let location = msg
            .venue()
            .map(|v| &v.location)
            .or_else(|| msg.location())
            .map(|loc| GeoPoint {
                latitude: loc.latitude,
                longitude: loc.longitude,
            });

        let reply_to = msg
            .reply_to_message()
            .and_then(|reply| reply.from.as_ref())
            .map(|sender| ReplyRef {
                sender: Sender::from_user(sender),
            });

        Some(Self {
            id: msg.id.0,
            from: Sender::from_user(from),
            chat: ChatRef::from_chat(&msg.chat),
            text: msg.text().map(str::to_owned),
            caption: msg.caption().map(str::to_owned),
            edited,
            media,
            has_media,
            location,
            reply_to,
        })
    }
}

/// An inline-keyboard button press.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// Callback query id, needed to acknowledge the press.
    pub id: String,
    pub from: Sender,
    /// Chat of the originating message, if Telegram still knows it.
    pub chat: Option<ChatRef>,
    pub message_id: Option<i32>,
    /// When the originating message was sent; drives handler cooldowns.
    pub message_date: Option<DateTime<Utc>>,
    pub data: String,
}

impl CallbackEvent {
    pub fn from_telegram(query: &teloxide::types::CallbackQuery) -> Self {
        let (chat, message_id, message_date) = match &query.message {
            Some(MaybeInaccessibleMessage::Regular(msg)) => (
                Some(ChatRef::from_chat(&msg.chat)),
                Some(msg.id.0),
                Some(msg.date),
            ),
            Some(MaybeInaccessibleMessage::Inaccessible(msg)) => (
                Some(ChatRef::from_chat(&msg.chat)),
                Some(msg.message_id.0),
                None,
            ),
            None => (None, None, None),
        };

        Self {
            id: query.id.clone(),
            from: Sender::from_user(&query.from),
            chat,
            message_id,
            message_date,
            data: query.data.clone().unwrap_or_default(),
        }
    }

    /// True if the originating message was posted in a group or supergroup.
    pub fn from_group(&self) -> bool {
        self.chat.as_ref().is_some_and(ChatRef::is_group)
    }
}

/// An inline query typed after the bot's username in any chat.
#[derive(Debug, Clone)]
pub struct InlineQueryEvent {
    pub id: String,
    pub from: Sender,
    pub query: String,
}

impl InlineQueryEvent {
    pub fn from_telegram(query: &teloxide::types::InlineQuery) -> Self {
        Self {
            id: query.id.clone(),
            from: Sender::from_user(&query.from),
            query: query.query.clone(),
        }
    }
}

/// A single notification from the messaging platform.
#[derive(Debug, Clone)]
pub enum Event {
    Message(MessageEvent),
    Callback(CallbackEvent),
    InlineQuery(InlineQueryEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_text_prefers_caption() {
        let event = crate::bot::testing::message_event("caption wins");
        assert_eq!(event.effective_text(), "caption wins");

        let with_caption = MessageEvent {
            caption: Some("the caption".to_string()),
            text: None,
            ..event
        };
        assert_eq!(with_caption.effective_text(), "the caption");
    }

    #[test]
    fn group_detection_covers_supergroups() {
        let group = ChatRef {
            id: -100,
            kind: ChatKind::Supergroup,
            title: Some("g".to_string()),
        };
        assert!(group.is_group());
        assert!(!group.is_private());

        let private = ChatRef {
            id: 1,
            kind: ChatKind::Private,
            title: None,
        };
        assert!(!private.is_group());
        assert!(private.is_private());
    }
}
