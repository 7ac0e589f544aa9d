//! Cache Item Module
//!
//! Caller-held handle that pins a cached entry while its payload is read.

use std::fmt;
use std::sync::Arc;

use crate::cache::store::Shared;

// == Cache Item ==
/// Pinned handle to a cached entry, returned by a successful lookup.
///
/// While the handle is alive the entry cannot be evicted, and its payload
/// stays valid even if the entry is replaced or purged meanwhile. Reading the
/// payload takes no lock.
///
/// Release the handle with [`CacheItem::close`]; dropping it has the same
/// effect. Releasing the last handle of a retired entry destroys that entry
/// on the releasing thread.
#[must_use = "a cache item pins its entry until it is closed or dropped"]
pub struct CacheItem<K, V> {
    store: Shared<K, V>,
    slot: usize,
    payload: Arc<V>,
    size: u64,
    released: bool,
}

impl<K, V> CacheItem<K, V> {
    pub(crate) fn new(store: Shared<K, V>, slot: usize, payload: Arc<V>, size: u64) -> Self {
        Self {
            store,
            slot,
            payload,
            size,
            released: false,
        }
    }

    // == Data ==
    /// Returns the payload and its caller-supplied size.
    pub fn data(&self) -> (&V, u64) {
        (self.payload.as_ref(), self.size)
    }

    pub fn payload(&self) -> &V {
        &self.payload
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    // == Close ==
    /// Releases the handle.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // The guard is dropped before any cleanup runs
        let retired = self.store.lock().release(self.slot);
        if let Some(entry) = retired {
            entry.destroy();
        }
    }
}

impl<K, V> Drop for CacheItem<K, V> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K, V> fmt::Debug for CacheItem<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem")
            .field("slot", &self.slot)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
