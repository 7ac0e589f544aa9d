//! Frame Cache - A bounded, reference-counted object cache
//!
//! Caches data derived from long-lived objects (decoded frames, scaled images,
//! computed buffers) keyed by the identity of the owning object, with LRU
//! eviction that never frees a payload while a handle still reads it.

pub mod cache;
pub mod config;
pub mod error;
pub mod owner;
pub mod tasks;

pub use cache::{CacheItem, CacheStats, CacheStore, NoRelease, Release};
pub use config::{CacheConfig, SoakConfig, Weighing};
pub use error::{CacheError, Result};
pub use owner::OwnerId;
pub use tasks::{run_soak, spawn_stats_reporter};
