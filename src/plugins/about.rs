//! Version and uptime info.
//!
//! `/about` sends the build info with a refresh button; the button has a
//! short cooldown and retracts itself when pressed.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::bot::handler::{
    pattern, CallbackContext, CallbackHandler, CommandContext, CommandHandler, Trigger,
};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

const REFRESH_DATA: &str = "about_refresh";

pub struct AboutPlugin;

impl AboutPlugin {
    pub fn new() -> Self {
        // Anchor the uptime clock at construction, not at first use.
        Lazy::force(&STARTED_AT);
        Self
    }
}

fn about_text() -> String {
    let uptime = STARTED_AT.elapsed();
    let hours = uptime.as_secs() / 3600;
    let minutes = (uptime.as_secs() % 3600) / 60;

    format!(
        "<b>Talos</b> <code>{}</code>\nUptime: {}h {}m",
        env!("CARGO_PKG_VERSION"),
        hours,
        minutes
    )
}

impl Plugin for AboutPlugin {
    fn name(&self) -> &'static str {
        "about"
    }

    fn handlers(&self, me: &BotIdentity) -> Handlers {
        Handlers {
            commands: vec![CommandHandler::new(
                Trigger::Pattern(pattern(&format!(r"(?i)^/about(?:@{})?$", me.username))),
                on_about,
            )],
            callbacks: vec![CallbackHandler::new(
                pattern(&format!("^{REFRESH_DATA}$")),
                on_refresh,
            )
            .cooldown(Duration::from_secs(3))
            .delete_button()],
            ..Default::default()
        }
    }
}

async fn on_about(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.api
        .send_message_with_button(
            ctx.message.chat.id,
            &about_text(),
            "🔄 Refresh",
            REFRESH_DATA,
        )
        .await
}

async fn on_refresh(ctx: CallbackContext) -> anyhow::Result<()> {
    let Some(chat) = &ctx.callback.chat else {
        return Ok(());
    };

    ctx.api
        .send_message_with_button(chat.id, &about_text(), "🔄 Refresh", REFRESH_DATA)
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::handler::Captures;
    use crate::bot::testing::{callback_event, message_event, ApiCall, MockApi};

    #[test]
    fn callback_handler_has_cooldown_and_retracts_button() {
        let me = BotIdentity {
            id: 1,
            username: "testbot".to_string(),
        };
        let handlers = AboutPlugin::new().handlers(&me);
        let callback = &handlers.callbacks[0];

        assert_eq!(callback.cooldown, Some(Duration::from_secs(3)));
        assert!(callback.delete_button);
        assert!(callback.pattern.is_match(REFRESH_DATA));
    }

    #[tokio::test]
    async fn about_sends_version_with_refresh_button() {
        let api = Arc::new(MockApi::default());
        let ctx = CommandContext {
            api: api.clone(),
            message: message_event("/about"),
            captures: Captures::default(),
        };

        on_about(ctx).await.unwrap();

        match &api.calls()[..] {
            [ApiCall::SendMessageWithButton { text, data, .. }] => {
                assert!(text.contains(env!("CARGO_PKG_VERSION")));
                assert_eq!(data, REFRESH_DATA);
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_sends_a_fresh_message() {
        let api = Arc::new(MockApi::default());
        let ctx = CallbackContext {
            api: api.clone(),
            callback: callback_event(5, REFRESH_DATA, Duration::from_secs(10)),
            captures: Captures::default(),
        };

        on_refresh(ctx).await.unwrap();

        assert_eq!(api.calls().len(), 1);
    }
}
