//! MongoDB implementations of the persistence contracts.

mod activity_repository;
mod allow_repository;
mod plugin_repository;

pub use activity_repository::ActivityRepository;
pub use allow_repository::AllowRepository;
pub use plugin_repository::PluginRepository;
