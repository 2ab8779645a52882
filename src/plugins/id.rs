//! Identity lookup: `/id` command and `id` inline query.

use crate::bot::event::Sender;
use crate::bot::handler::{
    pattern, CommandContext, CommandHandler, InlineContext, InlineHandler, Trigger,
};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};
use crate::utils::escape_html;

/// Telegram may cache the inline answer for this long; identity data is
/// effectively static.
const ID_CACHE_TIME: u32 = 7200;

pub struct IdPlugin;

impl Plugin for IdPlugin {
    fn name(&self) -> &'static str {
        "id"
    }

    fn handlers(&self, me: &BotIdentity) -> Handlers {
        Handlers {
            commands: vec![CommandHandler::new(
                Trigger::Pattern(pattern(&format!(
                    r"^/(?:whoami|id)(?:@{})?$",
                    me.username
                ))),
                on_id,
            )],
            inlines: vec![
                InlineHandler::new(pattern(r"^(?:whoami|id)$"), on_id_inline).usable_by_everyone(),
            ],
            ..Default::default()
        }
    }
}

fn describe(sender: &Sender) -> String {
    let mut text = format!(
        "<b>{}</b> <code>[{}]</code>",
        escape_html(&sender.full_name()),
        sender.id
    );
    if let Some(username) = &sender.username {
        text.push_str(&format!(" <b>(@{username})</b>"));
    }
    text
}

async fn on_id(ctx: CommandContext) -> anyhow::Result<()> {
    let mut text = format!("You are {}", describe(&ctx.message.from));

    if ctx.message.chat.is_group() {
        let title = ctx.message.chat.title.as_deref().unwrap_or("");
        text.push_str(&format!(
            "\nGroup: <b>{}</b> <code>[{}]</code>",
            escape_html(title),
            ctx.message.chat.id
        ));
    }

    ctx.reply(&text).await
}

async fn on_id_inline(ctx: InlineContext) -> anyhow::Result<()> {
    let text = describe(&ctx.query.from);

    ctx.api
        .answer_inline_article(
            &ctx.query.id,
            &ctx.query.from.id.to_string(),
            &text,
            ID_CACHE_TIME,
        )
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::handler::Captures;
    use crate::bot::testing::{
        group_message_event, inline_query_event, ApiCall, MockApi,
    };

    #[tokio::test]
    async fn command_includes_group_info_in_groups() {
        let api = Arc::new(MockApi::default());
        let ctx = CommandContext {
            api: api.clone(),
            message: group_message_event(-77, 5, "/id"),
            captures: Captures::default(),
        };

        on_id(ctx).await.unwrap();

        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => {
                assert!(text.contains("<code>[5]</code>"));
                assert!(text.contains("Group:"));
                assert!(text.contains("[-77]"));
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn inline_answer_is_an_article_titled_with_the_id() {
        let api = Arc::new(MockApi::default());
        let ctx = InlineContext {
            api: api.clone(),
            query: inline_query_event(5, "id"),
            captures: Captures::default(),
        };

        on_id_inline(ctx).await.unwrap();

        match &api.calls()[..] {
            [ApiCall::AnswerInlineArticle { title, text, .. }] => {
                assert_eq!(title, "5");
                assert!(text.contains("<code>[5]</code>"));
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }
}
