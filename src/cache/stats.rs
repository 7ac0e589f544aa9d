//! Cache Statistics Module
//!
//! Tracks cache activity (hits, misses, evictions, deferred destructions) and
//! gauges of the store's current occupancy.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache counters and occupancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that returned a handle
    pub hits: u64,
    /// Number of lookups for owners with no indexed entry
    pub misses: u64,
    /// Number of entries created by `put`
    pub insertions: u64,
    /// Number of indexed entries superseded by a newer `put` for the same owner
    pub replacements: u64,
    /// Number of entries retired by capacity enforcement
    pub evictions: u64,
    /// Number of entries retired by an explicit purge
    pub purges: u64,
    /// Number of entries destroyed (cleanup run)
    pub destroyed: u64,
    /// Number of entries retired while still pinned, destroyed later on release
    pub deferred: u64,
    /// Currently indexed entries
    pub entries: usize,
    /// Current indexed weight
    pub weight: u64,
    /// Configured capacity
    pub capacity: u64,
    /// Indexed entries with outstanding handles
    pub pinned: usize,
    /// Retired entries still held by outstanding handles
    pub retired_pinned: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Entries created but not yet destroyed, indexed or not.
    pub fn live(&self) -> u64 {
        self.insertions - self.destroyed
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    pub fn record_replacement(&mut self) {
        self.replacements += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_purge(&mut self) {
        self.purges += 1;
    }

    pub fn record_destroyed(&mut self) {
        self.destroyed += 1;
    }

    pub fn record_deferred(&mut self) {
        self.deferred += 1;
    }
}
