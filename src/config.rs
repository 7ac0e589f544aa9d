//! Configuration Module
//!
//! Capacity policy for a cache store, plus the environment-driven settings of
//! the soak harness binary.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::{DEFAULT_CAPACITY, MAX_UNIT_CAPACITY};
use crate::error::{CacheError, Result};

// == Weighing ==
/// How much of the capacity an entry consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighing {
    /// Every entry weighs one unit; capacity is an entry count
    #[default]
    Units,
    /// Every entry weighs its caller-supplied size; capacity is a byte budget
    Bytes,
}

impl Weighing {
    /// Returns the weight charged for an entry of `size`.
    pub fn weigh(self, size: u64) -> u64 {
        match self {
            Weighing::Units => 1,
            Weighing::Bytes => size,
        }
    }
}

impl FromStr for Weighing {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "units" | "unit" | "entries" => Ok(Weighing::Units),
            "bytes" | "byte" => Ok(Weighing::Bytes),
            other => Err(format!("unknown weighing policy '{}'", other)),
        }
    }
}

impl fmt::Display for Weighing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighing::Units => f.write_str("units"),
            Weighing::Bytes => f.write_str("bytes"),
        }
    }
}

// == Cache Config ==
/// Capacity configuration of a single cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Indexed weight retained before least recently used entries are evicted
    pub capacity: u64,
    /// Weighing policy used for capacity accounting
    pub weighing: Weighing,
}

impl CacheConfig {
    /// Unit-weighted config holding at most `capacity` entries.
    pub fn units(capacity: u64) -> Self {
        Self {
            capacity,
            weighing: Weighing::Units,
        }
    }

    /// Byte-weighted config holding at most `capacity` bytes of payload.
    pub fn bytes(capacity: u64) -> Self {
        Self {
            capacity,
            weighing: Weighing::Bytes,
        }
    }

    /// Checks that `limit` is an acceptable capacity under this policy.
    pub fn validate_capacity(&self, limit: u64) -> Result<()> {
        if self.weighing == Weighing::Units && limit > MAX_UNIT_CAPACITY {
            return Err(CacheError::InvalidCapacity {
                limit,
                max: MAX_UNIT_CAPACITY,
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::units(DEFAULT_CAPACITY)
    }
}

// == Soak Config ==
/// Settings of the soak harness.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Serialize)]
pub struct SoakConfig {
    /// Capacity of the store under test
    pub cache: CacheConfig,
    /// Number of concurrent worker threads
    pub workers: usize,
    /// Number of distinct owners the workers contend on
    pub owners: usize,
    /// Wall-clock length of the run in seconds
    pub duration_secs: u64,
    /// Interval in seconds between statistics reports
    pub report_interval_secs: u64,
    /// Size of every payload written by the workers
    pub payload_bytes: usize,
}

impl SoakConfig {
    /// Creates a new SoakConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Store capacity in weight units (default: 64)
    /// - `CACHE_WEIGHING` - `units` or `bytes` (default: units)
    /// - `SOAK_WORKERS` - Worker threads (default: 4)
    /// - `SOAK_OWNERS` - Distinct owners (default: 128)
    /// - `SOAK_DURATION_SECS` - Run length in seconds (default: 5)
    /// - `SOAK_REPORT_INTERVAL_SECS` - Stats report interval (default: 1)
    /// - `SOAK_PAYLOAD_BYTES` - Payload size in bytes (default: 4096)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig {
                capacity: env_or("CACHE_CAPACITY", defaults.cache.capacity),
                weighing: env_or("CACHE_WEIGHING", defaults.cache.weighing),
            },
            workers: env_or("SOAK_WORKERS", defaults.workers).max(1),
            owners: env_or("SOAK_OWNERS", defaults.owners).max(1),
            duration_secs: env_or("SOAK_DURATION_SECS", defaults.duration_secs),
            report_interval_secs: env_or(
                "SOAK_REPORT_INTERVAL_SECS",
                defaults.report_interval_secs,
            )
            .max(1),
            payload_bytes: env_or("SOAK_PAYLOAD_BYTES", defaults.payload_bytes),
        }
    }
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::units(64),
            workers: 4,
            owners: 128,
            duration_secs: 5,
            report_interval_secs: 1,
            payload_bytes: 4096,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
