//! Feature plugins.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the plugin to `all()`

pub mod about;
pub mod allow;
pub mod echo;
pub mod gps;
pub mod id;
pub mod manager;

use std::sync::Arc;

use crate::bot::allowlist::AllowList;
use crate::bot::manager::PluginManager;
use crate::bot::plugin::Plugin;

/// Every plugin this build ships, in registration (= evaluation) order.
pub fn all(allowlist: AllowList, plugin_manager: PluginManager) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(about::AboutPlugin::new()),
        Arc::new(allow::AllowPlugin::new(allowlist)),
        Arc::new(echo::EchoPlugin),
        Arc::new(gps::GpsPlugin),
        Arc::new(id::IdPlugin),
        Arc::new(manager::ManagerPlugin::new(plugin_manager)),
    ]
}
