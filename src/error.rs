//! Error types for the frame cache
//!
//! Provides unified error handling using thiserror.

use std::collections::TryReserveError;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// A cache miss is not an error: lookups report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store was closed and must not be used any more
    #[error("Cache store is closed")]
    Closed,

    /// Growing the store's bookkeeping failed; nothing was inserted
    #[error("Allocation failed while growing {what}: {source}")]
    AllocationFailed {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// Requested capacity exceeds what the weighing policy allows
    #[error("Invalid capacity {limit}: unit-weighted caches hold at most {max} entries")]
    InvalidCapacity { limit: u64, max: u64 },
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
