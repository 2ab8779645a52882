//! Event routing core.
//!
//! One inbound event flows through a fixed gauntlet: allow-list check,
//! per-event bookkeeping, trigger matching across every registered plugin,
//! feature-flag and role gating, and finally a supervised fire-and-forget
//! task per matched handler. The matching path itself never awaits plugin
//! I/O, so the intake loop keeps up no matter how slow the plugins are.
//!
//! Handlers are evaluated in plugin registration order and, within a
//! plugin, in declaration order. That fixes which gating checks run first;
//! completion order is up to the scheduler, since launched tasks are never
//! joined.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::allowlist::AllowList;
use super::api::BotApi;
use super::event::{CallbackEvent, Event, InlineQueryEvent, MessageEvent};
use super::handler::{CallbackContext, Captures, CommandContext, InlineContext};
use super::manager::PluginManager;
use super::plugin::PluginRegistry;
use super::supervisor::{self, Origin};
use crate::database::store::ActivityStore;

const TEXT_NOT_ALLOWED: &str = "You are not allowed to use this bot.";
const TEXT_NOT_AVAILABLE: &str = "This command is not available.";
const TEXT_NOT_ADMIN: &str = "You are not the bot administrator.";

/// The routing core. One instance per process, shared by every intake
/// branch.
pub struct Dispatcher {
    api: Arc<dyn BotApi>,
    registry: Arc<PluginRegistry>,
    allowlist: AllowList,
    manager: PluginManager,
    activity: Arc<dyn ActivityStore>,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn BotApi>,
        registry: Arc<PluginRegistry>,
        allowlist: AllowList,
        manager: PluginManager,
        activity: Arc<dyn ActivityStore>,
    ) -> Self {
        Self {
            api,
            registry,
            allowlist,
            manager,
            activity,
        }
    }

    /// Single entry point for every platform notification.
    pub async fn dispatch(&self, event: Event) -> anyhow::Result<()> {
        match event {
            Event::Message(message) => self.handle_message(message).await,
            Event::Callback(callback) => self.handle_callback(callback).await,
            Event::InlineQuery(query) => self.handle_inline_query(query).await,
        }
    }

    /// Pass-through for update kinds the core intentionally ignores.
    /// Exists so upstream middleware still runs for them.
    pub fn null_route(&self) {}

    async fn handle_message(&self, event: MessageEvent) -> anyhow::Result<()> {
        let mut is_allowed = self.allowlist.is_user_allowed(event.from.id);
        if event.chat.is_group() && !is_allowed {
            is_allowed = self.allowlist.is_chat_allowed(event.chat.id);
        }

        if !is_allowed {
            // Unauthenticated probing is dropped without acknowledgement.
            debug!(chat_id = event.chat.id, "User/Chat is not allowed");
            return Ok(());
        }

        if !event.edited {
            if event.chat.is_private() {
                self.activity.record_user_seen(&event.from).await?;
            } else {
                self.activity
                    .record_chat_membership(event.chat.id, &event.from)
                    .await?;
            }
        }

        let text = event.effective_text().to_string();

        for plugin in self.registry.plugins() {
            for handler in &plugin.handlers.commands {
                if event.edited && !handler.handle_edits {
                    continue;
                }
                if !event.chat.is_group() && handler.group_only {
                    continue;
                }

                let Some(captures) = handler.trigger.match_message(&event, &text) else {
                    continue;
                };

                info!("Matched plugin '{}': {}", plugin.name, handler.trigger);

                if !self.manager.is_plugin_enabled(plugin.name) {
                    info!("Plugin {} is disabled globally", plugin.name);
                    continue;
                }

                if event.chat.is_group()
                    && self
                        .manager
                        .is_plugin_disabled_for_chat(event.chat.id, plugin.name)
                {
                    info!("Plugin {} is disabled for this chat", plugin.name);
                    continue;
                }

                if handler.admin_only && !self.allowlist.is_admin(event.from.id) {
                    debug!("User is not the bot administrator");
                    continue;
                }

                supervisor::spawn(
                    self.api.clone(),
                    plugin.name,
                    Origin::Command {
                        chat_id: event.chat.id,
                    },
                    handler.run(CommandContext {
                        api: self.api.clone(),
                        message: event.clone(),
                        captures,
                    }),
                );
            }
        }

        Ok(())
    }

    async fn handle_callback(&self, event: CallbackEvent) -> anyhow::Result<()> {
        if event.data.is_empty() {
            return self.api.ack_callback(&event.id).await;
        }

        let mut is_allowed = self.allowlist.is_user_allowed(event.from.id);
        if event.from_group() && !is_allowed {
            if let Some(chat) = &event.chat {
                is_allowed = self.allowlist.is_chat_allowed(chat.id);
            }
        }

        if !is_allowed {
            return self
                .api
                .answer_callback(&event.id, TEXT_NOT_ALLOWED, true)
                .await;
        }

        for plugin in self.registry.plugins() {
            for handler in &plugin.handlers.callbacks {
                let Some(captures) = Captures::from_pattern(&handler.pattern, &event.data) else {
                    continue;
                };

                info!("Matched plugin '{}': {}", plugin.name, handler.pattern);

                // A callback acknowledgement is one-shot, so a gating
                // failure answers it and ends the whole dispatch.
                if !self.manager.is_plugin_enabled(plugin.name) {
                    info!("Plugin {} is disabled globally", plugin.name);
                    return self
                        .api
                        .answer_callback(&event.id, TEXT_NOT_AVAILABLE, true)
                        .await;
                }

                if event.from_group() {
                    let chat_id = event.chat.as_ref().map(|chat| chat.id).unwrap_or_default();
                    if self
                        .manager
                        .is_plugin_disabled_for_chat(chat_id, plugin.name)
                    {
                        info!("Plugin {} is disabled for this chat", plugin.name);
                        return self
                            .api
                            .answer_callback(&event.id, TEXT_NOT_AVAILABLE, true)
                            .await;
                    }
                }

                if handler.admin_only && !self.allowlist.is_admin(event.from.id) {
                    debug!("User is not the bot administrator");
                    return self
                        .api
                        .answer_callback(&event.id, TEXT_NOT_ADMIN, true)
                        .await;
                }

                if let (Some(cooldown), Some(sent_at)) = (handler.cooldown, event.message_date) {
                    let elapsed = (Utc::now() - sent_at)
                        .to_std()
                        .unwrap_or(std::time::Duration::ZERO);
                    if elapsed < cooldown {
                        let wait = (cooldown - elapsed).as_secs_f64();
                        return self
                            .api
                            .answer_callback(
                                &event.id,
                                &format!("🕒 Please wait another {wait:.1} seconds."),
                                true,
                            )
                            .await;
                    }
                }

                if handler.delete_button {
                    if let (Some(chat), Some(message_id)) = (&event.chat, event.message_id) {
                        let api = self.api.clone();
                        let chat_id = chat.id;
                        tokio::spawn(async move {
                            if let Err(err) = api.remove_reply_markup(chat_id, message_id).await {
                                debug!(error = %err, chat_id, "Error removing inline keyboard");
                            }
                        });
                    }
                }

                supervisor::spawn(
                    self.api.clone(),
                    plugin.name,
                    Origin::Callback {
                        chat_id: event.chat.as_ref().map(|chat| chat.id),
                    },
                    handler.run(CallbackContext {
                        api: self.api.clone(),
                        callback: event.clone(),
                        captures,
                    }),
                );
            }
        }

        Ok(())
    }

    async fn handle_inline_query(&self, event: InlineQueryEvent) -> anyhow::Result<()> {
        if event.query.is_empty() {
            return self.api.answer_inline_empty(&event.id).await;
        }

        let mut matched_any = false;

        for plugin in self.registry.plugins() {
            for handler in &plugin.handlers.inlines {
                let Some(captures) = Captures::from_pattern(&handler.pattern, &event.query) else {
                    continue;
                };

                info!("Matched plugin '{}': {}", plugin.name, handler.pattern);

                if !self.manager.is_plugin_enabled(plugin.name) {
                    info!("Plugin {} is disabled globally", plugin.name);
                    return self.api.answer_inline_empty(&event.id).await;
                }

                if handler.admin_only && !self.allowlist.is_admin(event.from.id) {
                    debug!("User is not the bot administrator");
                    return self.api.answer_inline_empty(&event.id).await;
                }

                // Inline mode has no chat context, so there is no chat
                // fallback here.
                if !handler.usable_by_everyone && !self.allowlist.is_user_allowed(event.from.id) {
                    return self.api.answer_inline_empty(&event.id).await;
                }

                matched_any = true;
                supervisor::spawn(
                    self.api.clone(),
                    plugin.name,
                    Origin::Inline {
                        user_id: event.from.id,
                    },
                    handler.run(InlineContext {
                        api: self.api.clone(),
                        query: event.clone(),
                        captures,
                    }),
                );
            }
        }

        if !matched_any {
            return self.api.answer_inline_empty(&event.id).await;
        }

        Ok(())
    }
}
