//! Handler descriptors and trigger matching.
//!
//! A plugin registers handlers in one of three categories, mirroring the
//! three event kinds: command handlers (messages), callback handlers
//! (button presses) and inline handlers (inline queries). Command handlers
//! match on a [`Trigger`] — a compiled pattern or a media classification —
//! while callback and inline handlers are typed to hold a pattern directly,
//! so a mis-categorised trigger cannot be constructed at all.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use regex::Regex;

use super::api::BotApi;
use super::event::{CallbackEvent, InlineQueryEvent, MediaTag, MessageEvent};

/// Compile a trigger pattern, panicking on invalid syntax.
///
/// Trigger patterns are literals written at plugin registration time, so a
/// bad pattern is a programming error that should stop startup.
pub fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("invalid trigger pattern")
}

/// What a message must look like to match a command handler.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Matched against the message's caption-or-text.
    Pattern(Regex),
    /// Matched against the message's media classification.
    Media(MediaTrigger),
}

/// Media classifications a command handler can subscribe to.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTrigger {
    Photo,
    Document,
    Sticker,
    Animation,
    Voice,
    Location,
    Venue,
    /// Any message carrying media of any kind.
    AnyMedia,
    /// Any message at all.
    AnyMessage,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Pattern(re) => write!(f, "{}", re.as_str()),
            Trigger::Media(kind) => write!(f, "{kind:?}"),
        }
    }
}

impl Trigger {
    /// Match against a message, producing captures on success.
    ///
    /// `text` is the caller-resolved caption-or-text; passing it in avoids
    /// re-resolving it for every handler.
    pub fn match_message(&self, event: &MessageEvent, text: &str) -> Option<Captures> {
        match self {
            Trigger::Pattern(re) => Captures::from_pattern(re, text),
            Trigger::Media(kind) => {
                let tag_matched = match event.media {
                    Some(MediaTag::Photo) => *kind == MediaTrigger::Photo,
                    Some(MediaTag::Document) => *kind == MediaTrigger::Document,
                    Some(MediaTag::Sticker) => *kind == MediaTrigger::Sticker,
                    Some(MediaTag::Animation) => *kind == MediaTrigger::Animation,
                    Some(MediaTag::Voice) => *kind == MediaTrigger::Voice,
                    Some(MediaTag::Location) => *kind == MediaTrigger::Location,
                    Some(MediaTag::Venue) => *kind == MediaTrigger::Venue,
                    None => false,
                };

                let matched = tag_matched
                    || (event.has_media && *kind == MediaTrigger::AnyMedia)
                    || *kind == MediaTrigger::AnyMessage;

                matched.then(Captures::default)
            }
        }
    }
}

/// Regex match results handed to a handler.
///
/// `matches[0]` is the whole match, followed by one entry per capture group
/// (empty string for groups that did not participate).
#[derive(Debug, Clone, Default)]
pub struct Captures {
    pub matches: Vec<String>,
    pub named: HashMap<String, String>,
}

impl Captures {
    pub fn from_pattern(re: &Regex, text: &str) -> Option<Self> {
        let caps = re.captures(text)?;

        let matches = (0..caps.len())
            .map(|i| caps.get(i).map_or("", |m| m.as_str()).to_string())
            .collect();

        let named = re
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();

        Some(Self { matches, named })
    }

    /// Capture group by index, empty string if absent.
    pub fn get(&self, index: usize) -> &str {
        self.matches.get(index).map_or("", String::as_str)
    }
}

/// Context handed to a command handler.
#[derive(Clone)]
pub struct CommandContext {
    pub api: Arc<dyn BotApi>,
    pub message: MessageEvent,
    pub captures: Captures,
}

impl CommandContext {
    /// Reply to the triggering message.
    pub async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.api
            .reply_to(self.message.chat.id, self.message.id, text)
            .await
    }
}

/// Context handed to a callback handler.
#[derive(Clone)]
pub struct CallbackContext {
    pub api: Arc<dyn BotApi>,
    pub callback: CallbackEvent,
    pub captures: Captures,
}

/// Context handed to an inline handler.
#[derive(Clone)]
pub struct InlineContext {
    pub api: Arc<dyn BotApi>,
    pub query: InlineQueryEvent,
    pub captures: Captures,
}

type CommandFn = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type CallbackFn =
    Arc<dyn Fn(CallbackContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type InlineFn = Arc<dyn Fn(InlineContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A handler for text and media messages.
#[derive(Clone)]
pub struct CommandHandler {
    pub trigger: Trigger,
    handler: CommandFn,
    pub admin_only: bool,
    pub group_only: bool,
    pub handle_edits: bool,
}

impl CommandHandler {
    pub fn new<F, Fut>(trigger: Trigger, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            trigger,
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
            admin_only: false,
            group_only: false,
            handle_edits: false,
        }
    }

    /// Only the bot administrator may trigger this handler.
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Only messages from groups and supergroups trigger this handler.
    pub fn group_only(mut self) -> Self {
        self.group_only = true;
        self
    }

    /// Also run on edited messages.
    pub fn handle_edits(mut self) -> Self {
        self.handle_edits = true;
        self
    }

    pub fn run(&self, ctx: CommandContext) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.handler)(ctx)
    }
}

/// A handler for inline-keyboard button presses.
///
/// Always pattern-triggered: the pattern is matched against the opaque
/// callback data string.
#[derive(Clone)]
pub struct CallbackHandler {
    pub pattern: Regex,
    handler: CallbackFn,
    pub admin_only: bool,
    /// Minimum time since the originating message before the handler may
    /// run again from that message's button.
    pub cooldown: Option<Duration>,
    /// Strip the inline keyboard from the originating message when run.
    pub delete_button: bool,
}

impl CallbackHandler {
    pub fn new<F, Fut>(pattern: Regex, handler: F) -> Self
    where
        F: Fn(CallbackContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            pattern,
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
            admin_only: false,
            cooldown: None,
            delete_button: false,
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn cooldown(mut self, duration: Duration) -> Self {
        self.cooldown = Some(duration);
        self
    }

    pub fn delete_button(mut self) -> Self {
        self.delete_button = true;
        self
    }

    pub fn run(&self, ctx: CallbackContext) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.handler)(ctx)
    }
}

/// A handler for inline queries.
#[derive(Clone)]
pub struct InlineHandler {
    pub pattern: Regex,
    handler: InlineFn,
    pub admin_only: bool,
    /// Skip the allow-list check for this handler.
    pub usable_by_everyone: bool,
}

impl InlineHandler {
    pub fn new<F, Fut>(pattern: Regex, handler: F) -> Self
    where
        F: Fn(InlineContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            pattern,
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
            admin_only: false,
            usable_by_everyone: false,
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn usable_by_everyone(mut self) -> Self {
        self.usable_by_everyone = true;
        self
    }

    pub fn run(&self, ctx: InlineContext) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.handler)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::message_event;

    #[test]
    fn pattern_captures_include_whole_match() {
        let re = pattern(r"^/echo (.+)$");
        let caps = Captures::from_pattern(&re, "/echo hello world").unwrap();
        assert_eq!(caps.matches, vec!["/echo hello world", "hello world"]);
    }

    #[test]
    fn named_captures_are_collected() {
        let re = pattern(r"^/remind (?P<when>\d+) (?P<what>.+)$");
        let caps = Captures::from_pattern(&re, "/remind 10 stretch").unwrap();
        assert_eq!(caps.named.get("when").map(String::as_str), Some("10"));
        assert_eq!(caps.named.get("what").map(String::as_str), Some("stretch"));
    }

    #[test]
    fn unmatched_groups_become_empty_strings() {
        let re = pattern(r"^/cmd(?: (.+))?$");
        let caps = Captures::from_pattern(&re, "/cmd").unwrap();
        assert_eq!(caps.matches, vec!["/cmd", ""]);
        assert_eq!(caps.get(1), "");
    }

    #[test]
    fn media_trigger_matches_specific_tag() {
        let mut event = message_event("");
        event.text = None;
        event.media = Some(MediaTag::Photo);
        event.has_media = true;

        assert!(Trigger::Media(MediaTrigger::Photo)
            .match_message(&event, "")
            .is_some());
        assert!(Trigger::Media(MediaTrigger::Document)
            .match_message(&event, "")
            .is_none());
    }

    #[test]
    fn any_media_matches_untagged_media() {
        let mut event = message_event("");
        event.text = None;
        event.media = None;
        event.has_media = true; // e.g. a video

        assert!(Trigger::Media(MediaTrigger::AnyMedia)
            .match_message(&event, "")
            .is_some());
        assert!(Trigger::Media(MediaTrigger::Photo)
            .match_message(&event, "")
            .is_none());
    }

    #[test]
    fn any_message_matches_plain_text() {
        let event = message_event("just text");
        assert!(Trigger::Media(MediaTrigger::AnyMessage)
            .match_message(&event, "just text")
            .is_some());
        assert!(Trigger::Media(MediaTrigger::AnyMedia)
            .match_message(&event, "just text")
            .is_none());
    }

    #[test]
    fn pattern_trigger_ignores_media_only_messages() {
        let mut event = message_event("");
        event.text = None;
        event.media = Some(MediaTag::Sticker);
        event.has_media = true;

        let trigger = Trigger::Pattern(pattern(r"^/start$"));
        assert!(trigger.match_message(&event, "").is_none());
    }
}
