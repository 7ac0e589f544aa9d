//! Cache Module
//!
//! Bounded, concurrency-safe object cache with reference-counted entries and
//! LRU eviction.

mod entry;
mod index;
mod item;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{NoRelease, Release};
pub use index::Index;
pub use item::CacheItem;
pub use lru::RecencyList;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Capacity of a store created without explicit configuration, in units
pub const DEFAULT_CAPACITY: u64 = 4;

/// Largest capacity accepted for a unit-weighted store
pub const MAX_UNIT_CAPACITY: u64 = 200;
