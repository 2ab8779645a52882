//! Talos - Modular Telegram Bot
//!
//! A Telegram bot built around a dispatch-and-permission core: inbound
//! updates are routed to registered plugin handlers, gated by an allow-list
//! and per-plugin feature flags.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB integration behind small store contracts
//! - `cache` - Moka-based caching for the bookkeeping hot path
//! - `bot` - The routing core: events, handlers, allow-list, feature
//!   flags, dispatcher, execution supervisor and the teloxide runtime
//! - `plugins` - Feature plugins (extensible)
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod database;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bot::allowlist::AllowList;
use bot::manager::PluginManager;
use bot::plugin::{BotIdentity, PluginRegistry};
use bot::{Dispatcher, TelegramApi};
use config::Config;
use database::repository::{ActivityRepository, AllowRepository, PluginRepository};
use database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("talos=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Talos {}...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}", config.bot_mode);

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    info!("Database connected");

    let allow_store = Arc::new(AllowRepository::new(&db));
    let plugin_store = Arc::new(PluginRepository::new(&db));
    let activity_store = Arc::new(ActivityRepository::new(&db));

    let allowlist = AllowList::load(config.admin_id, allow_store).await?;
    let plugin_manager = PluginManager::load(plugin_store).await?;

    // Throttle respects Telegram's rate limits (30 msg/s globally,
    // 1 msg/s per chat, 20 msg/min per group).
    let telegram_bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = telegram_bot.get_me().await?;
    info!("Logged in as @{} ({})", me.username(), me.user.id);

    let identity = BotIdentity {
        id: me.user.id.0 as i64,
        username: me.username().to_string(),
    };

    let registry = Arc::new(PluginRegistry::build(
        plugins::all(allowlist.clone(), plugin_manager.clone()),
        &identity,
    )?);
    plugin_manager.bind_plugins(registry.names());

    let api = Arc::new(TelegramApi::new(telegram_bot.clone()));
    let router = Arc::new(Dispatcher::new(
        api,
        registry,
        allowlist,
        plugin_manager,
        activity_store,
    ));

    let dispatcher = bot::build_dispatcher(telegram_bot.clone(), router);
    bot::run(&config, dispatcher, telegram_bot).await;

    Ok(())
}
