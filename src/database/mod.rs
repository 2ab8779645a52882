//! Persistence layer: MongoDB wrapper, document models, store contracts and
//! their repository implementations.

pub mod models;
mod mongo;
pub mod repository;
pub mod store;

pub use mongo::Database;
