//! Owner Identity Module
//!
//! Stable, never-reused identities for objects that own cached data.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

// == Owner Id ==
/// Monotonically unique identity for a cache owner.
///
/// Ids are minted from a process-wide counter and are never reused, so a
/// destroyed owner can never alias a live one the way a recycled address could.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Mints a fresh id, greater than every id minted before it.
    pub fn next() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}
