//! Update intake: teloxide dispatcher wiring and the polling runner.
//!
//! This is the only place that sees raw teloxide update types. Each branch
//! converts its update into a core [`Event`] and hands it to the routing
//! core; update kinds the core ignores are routed through explicit null
//! routes so they are still acknowledged.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::info;

use super::dispatcher::Dispatcher as Router;
use super::event::{CallbackEvent, Event, InlineQueryEvent, MessageEvent};
use super::ThrottledBot;
use crate::config::{BotMode, Config};

type TeloxideDispatcher =
    teloxide::dispatching::Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>;

/// Build the teloxide dispatcher feeding the routing core.
pub fn build_dispatcher(bot: ThrottledBot, router: Arc<Router>) -> TeloxideDispatcher {
    teloxide::dispatching::Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
}

fn schema() -> teloxide::dispatching::UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_edited_message().endpoint(on_edited_message))
        .branch(Update::filter_callback_query().endpoint(on_callback_query))
        .branch(Update::filter_inline_query().endpoint(on_inline_query))
        .branch(Update::filter_my_chat_member().endpoint(on_ignored))
        .branch(Update::filter_chat_member().endpoint(on_ignored))
}

async fn on_message(msg: Message, router: Arc<Router>) -> anyhow::Result<()> {
    match MessageEvent::from_telegram(&msg, false) {
        Some(event) => router.dispatch(Event::Message(event)).await,
        // Service messages (joins, leaves, title/photo changes, pins).
        None => {
            router.null_route();
            Ok(())
        }
    }
}

async fn on_edited_message(msg: Message, router: Arc<Router>) -> anyhow::Result<()> {
    match MessageEvent::from_telegram(&msg, true) {
        Some(event) => router.dispatch(Event::Message(event)).await,
        None => {
            router.null_route();
            Ok(())
        }
    }
}

async fn on_callback_query(query: CallbackQuery, router: Arc<Router>) -> anyhow::Result<()> {
    router
        .dispatch(Event::Callback(CallbackEvent::from_telegram(&query)))
        .await
}

async fn on_inline_query(query: InlineQuery, router: Arc<Router>) -> anyhow::Result<()> {
    router
        .dispatch(Event::InlineQuery(InlineQueryEvent::from_telegram(&query)))
        .await
}

async fn on_ignored(router: Arc<Router>) -> anyhow::Result<()> {
    router.null_route();
    Ok(())
}

/// Run the bot with the configured mode.
pub async fn run(config: &Config, mut dispatcher: TeloxideDispatcher, bot: ThrottledBot) {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            dispatcher.dispatch().await;
        }
        BotMode::Webhook => {
            info!("Starting bot in webhook mode...");
            super::webhook::start_webhook(config, dispatcher, bot).await;
        }
    }
}
