//! Allow-list management commands.
//!
//! `/allow` and `/deny`, administrator-only and group-only. Replying to a
//! message targets that message's sender; without a reply the current chat
//! is targeted.

use tracing::error;

use crate::bot::allowlist::{AllowError, AllowList};
use crate::bot::handler::{pattern, CommandContext, CommandHandler, Trigger};
use crate::bot::plugin::{BotIdentity, Handlers, Plugin};
use crate::utils::escape_html;

pub struct AllowPlugin {
    allowlist: AllowList,
}

impl AllowPlugin {
    pub fn new(allowlist: AllowList) -> Self {
        Self { allowlist }
    }
}

impl Plugin for AllowPlugin {
    fn name(&self) -> &'static str {
        "allow"
    }

    fn handlers(&self, me: &BotIdentity) -> Handlers {
        let username = &me.username;

        let allow = {
            let allowlist = self.allowlist.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(r"^/allow(?:@{username})?$"))),
                move |ctx| on_allow(allowlist.clone(), ctx),
            )
            .admin_only()
            .group_only()
        };

        let deny = {
            let allowlist = self.allowlist.clone();
            CommandHandler::new(
                Trigger::Pattern(pattern(&format!(r"^/deny(?:@{username})?$"))),
                move |ctx| on_deny(allowlist.clone(), ctx),
            )
            .admin_only()
            .group_only()
        };

        Handlers {
            commands: vec![allow, deny],
            ..Default::default()
        }
    }
}

async fn on_allow(allowlist: AllowList, ctx: CommandContext) -> anyhow::Result<()> {
    if let Some(reply) = &ctx.message.reply_to {
        // Allow the replied-to user everywhere.
        if reply.sender.is_bot {
            return ctx.reply("🤖🤖🤖").await;
        }

        let name = escape_html(&reply.sender.first_name);

        if allowlist.is_user_allowed(reply.sender.id) {
            return ctx
                .reply(&format!(
                    "✅ <b>{name}</b> may already use the bot everywhere."
                ))
                .await;
        }

        if let Err(err) = allowlist.allow_user(reply.sender.id).await {
            error!(user_id = reply.sender.id, error = %err, "Failed to allow user");
            return ctx.reply("❌ Failed to allow the user.").await;
        }

        ctx.reply(&format!("✅ <b>{name}</b> may now use the bot everywhere"))
            .await
    } else {
        // Allow the current chat.
        if allowlist.is_chat_allowed(ctx.message.chat.id) {
            return ctx.reply("✅ This chat may already use the bot.").await;
        }

        if let Err(err) = allowlist.allow_chat(ctx.message.chat.id).await {
            error!(chat_id = ctx.message.chat.id, error = %err, "Failed to allow chat");
            return ctx.reply("❌ Failed to allow the chat.").await;
        }

        ctx.reply("✅ This chat may now use the bot").await
    }
}

async fn on_deny(allowlist: AllowList, ctx: CommandContext) -> anyhow::Result<()> {
    if let Some(reply) = &ctx.message.reply_to {
        if reply.sender.is_bot {
            return ctx.reply("🤖🤖🤖").await;
        }

        let name = escape_html(&reply.sender.first_name);

        if !allowlist.is_user_allowed(reply.sender.id) {
            return ctx
                .reply(&format!("✅ <b>{name}</b> may not use the bot anyway."))
                .await;
        }

        match allowlist.deny_user(reply.sender.id).await {
            Ok(()) => {
                ctx.reply(&format!(
                    "✅ <b>{name}</b> may no longer use the bot everywhere"
                ))
                .await
            }
            Err(AllowError::Administrator) => {
                ctx.reply("❌ The bot administrator cannot be denied.").await
            }
            Err(err) => {
                error!(user_id = reply.sender.id, error = %err, "Failed to deny user");
                ctx.reply("❌ Failed to deny the user.").await
            }
        }
    } else {
        if !allowlist.is_chat_allowed(ctx.message.chat.id) {
            return ctx.reply("✅ This chat may not use the bot anyway.").await;
        }

        if let Err(err) = allowlist.deny_chat(ctx.message.chat.id).await {
            error!(chat_id = ctx.message.chat.id, error = %err, "Failed to deny chat");
            return ctx.reply("❌ Failed to deny the chat.").await;
        }

        ctx.reply("✅ This chat may no longer use the bot").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bot::event::ReplyRef;
    use crate::bot::testing::{
        group_message_event, sender, ApiCall, MemoryAllowStore, MockApi,
    };
    use crate::bot::handler::Captures;

    const ADMIN: i64 = 1000;

    async fn allowlist() -> AllowList {
        AllowList::load(ADMIN, Arc::new(MemoryAllowStore::default()))
            .await
            .unwrap()
    }

    fn reply_context(api: Arc<MockApi>, target: i64) -> CommandContext {
        let mut message = group_message_event(-50, ADMIN, "/allow");
        message.reply_to = Some(ReplyRef {
            sender: sender(target),
        });
        CommandContext {
            api,
            message,
            captures: Captures::default(),
        }
    }

    #[tokio::test]
    async fn allow_reply_targets_the_user() {
        let api = Arc::new(MockApi::default());
        let list = allowlist().await;

        on_allow(list.clone(), reply_context(api.clone(), 7))
            .await
            .unwrap();

        assert!(list.is_user_allowed(7));
        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => assert!(text.contains("may now use the bot")),
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn allow_without_reply_targets_the_chat() {
        let api = Arc::new(MockApi::default());
        let list = allowlist().await;

        let ctx = CommandContext {
            api: api.clone(),
            message: group_message_event(-50, ADMIN, "/allow"),
            captures: Captures::default(),
        };
        on_allow(list.clone(), ctx).await.unwrap();

        assert!(list.is_chat_allowed(-50));
    }

    #[tokio::test]
    async fn deny_administrator_is_rejected_with_reply() {
        let api = Arc::new(MockApi::default());
        let list = allowlist().await;

        on_deny(list.clone(), reply_context(api.clone(), ADMIN))
            .await
            .unwrap();

        assert!(list.is_user_allowed(ADMIN));
        match &api.calls()[..] {
            [ApiCall::ReplyTo { text, .. }] => {
                assert!(text.contains("administrator cannot be denied"));
            }
            calls => panic!("unexpected calls: {calls:?}"),
        }
    }

    #[tokio::test]
    async fn deny_reply_removes_the_user() {
        let api = Arc::new(MockApi::default());
        let list = allowlist().await;
        list.allow_user(7).await.unwrap();

        on_deny(list.clone(), reply_context(api.clone(), 7))
            .await
            .unwrap();

        assert!(!list.is_user_allowed(7));
    }
}
