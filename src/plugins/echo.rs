//! Echo command.

use crate::bot::handler::{pattern, CommandContext, CommandHandler, Trigger};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};
use crate::utils::escape_html;

pub struct EchoPlugin;

impl Plugin for EchoPlugin {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn handlers(&self, me: &BotIdentity) -> Handlers {
        Handlers {
            commands: vec![CommandHandler::new(
                Trigger::Pattern(pattern(&format!(
                    r"^/e(?:cho)?(?:@{})? (.+)$",
                    me.username
                ))),
                on_echo,
            )],
            ..Default::default()
        }
    }
}

async fn on_echo(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.reply(&escape_html(ctx.captures.get(1))).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::testing::{message_event, ApiCall, MockApi};

    #[test]
    fn matches_short_and_long_form() {
        let me = BotIdentity {
            id: 1,
            username: "testbot".to_string(),
        };
        let handlers = EchoPlugin.handlers(&me);
        let trigger = &handlers.commands[0].trigger;

        let event = message_event("/echo hello world");
        let caps = trigger.match_message(&event, "/echo hello world").unwrap();
        assert_eq!(caps.matches, vec!["/echo hello world", "hello world"]);

        assert!(trigger.match_message(&event, "/e hi").is_some());
        assert!(trigger.match_message(&event, "/echo@testbot hi").is_some());
        assert!(trigger.match_message(&event, "/echo").is_none());
    }

    #[tokio::test]
    async fn echoes_the_captured_text_escaped() {
        let api = Arc::new(MockApi::default());
        let ctx = CommandContext {
            api: api.clone(),
            message: message_event("/echo <b>"),
            captures: crate::bot::handler::Captures {
                matches: vec!["/echo <b>".to_string(), "<b>".to_string()],
                named: Default::default(),
            },
        };

        on_echo(ctx).await.unwrap();

        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => assert_eq!(text, "&lt;b&gt;"),
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }
}
