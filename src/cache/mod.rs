//! In-process caching built on Moka.
//!
//! Used by the activity repository to keep per-message bookkeeping off the
//! database hot path. The authoritative allow-list and feature-flag caches
//! do NOT live here: those are plain sets with write-through persistence,
//! because TTL eviction would silently turn an allowed user into a denied
//! one.

mod typed;

pub use typed::{CacheConfig, TypedCache};
