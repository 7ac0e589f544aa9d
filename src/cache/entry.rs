//! Cache Entry Module
//!
//! Defines the record binding an owner to its payload, plus the release
//! capability run when that record is destroyed.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

// == Release Capability ==
/// Cleanup action attached to a cached payload.
///
/// Invoked exactly once, when the entry is neither indexed nor pinned by any
/// outstanding handle. The payload memory itself is freed right after.
///
/// A panicking cleanup does not stop the other entries destroyed in the same
/// call from being cleaned up; the panic is resumed once they are done.
pub trait Release<V>: Send {
    fn release(self: Box<Self>, payload: &V);
}

impl<V, F> Release<V> for F
where
    F: FnOnce(&V) + Send + 'static,
{
    fn release(self: Box<Self>, payload: &V) {
        (*self)(payload)
    }
}

/// Release action that does nothing beyond dropping the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelease;

impl<V> Release<V> for NoRelease {
    fn release(self: Box<Self>, _payload: &V) {}
}

// == Cache Entry ==
/// A cached payload together with its accounting and lifetime state.
///
/// All fields other than `payload` are only touched under the store's
/// structural lock.
pub(crate) struct CacheEntry<K, V> {
    /// Owner the payload belongs to
    pub key: K,
    /// Payload, shared read-only with every outstanding handle
    pub payload: Arc<V>,
    /// Caller-supplied size
    pub size: u64,
    /// Weight charged against capacity while indexed
    pub weight: u64,
    /// Number of outstanding handles
    pub refcount: u32,
    /// Reachable through the index and recency list
    pub indexed: bool,
    cleanup: Box<dyn Release<V>>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new, indexed and unpinned entry.
    pub fn new(
        key: K,
        payload: V,
        size: u64,
        weight: u64,
        cleanup: Box<dyn Release<V>>,
    ) -> Self {
        Self {
            key,
            payload: Arc::new(payload),
            size,
            weight,
            refcount: 0,
            indexed: true,
            cleanup,
        }
    }

    /// Returns true while at least one handle holds the entry.
    pub fn is_pinned(&self) -> bool {
        self.refcount > 0
    }

    /// An entry may be destroyed only once it is both unpinned and unindexed.
    pub fn is_destroyable(&self) -> bool {
        self.refcount == 0 && !self.indexed
    }

    /// Detaches the entry from the store so it can be destroyed outside the lock.
    pub fn into_retired(self) -> RetiredEntry<K, V> {
        debug_assert!(self.is_destroyable());
        RetiredEntry {
            key: self.key,
            payload: self.payload,
            cleanup: self.cleanup,
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("size", &self.size)
            .field("weight", &self.weight)
            .field("refcount", &self.refcount)
            .field("indexed", &self.indexed)
            .finish_non_exhaustive()
    }
}

// == Retired Entry ==
/// An entry removed from the store with no remaining holders, awaiting cleanup.
pub(crate) struct RetiredEntry<K, V> {
    pub key: K,
    payload: Arc<V>,
    cleanup: Box<dyn Release<V>>,
}

impl<K, V> RetiredEntry<K, V> {
    /// Runs the cleanup action and releases the payload.
    pub fn destroy(self) {
        let RetiredEntry {
            key,
            payload,
            cleanup,
        } = self;
        cleanup.release(&payload);
        drop(payload);
        drop(key);
    }
}

/// Destroys every retired entry in order.
///
/// Each cleanup runs even when an earlier one panicked; the first panic is
/// resumed after the whole batch is destroyed.
pub(crate) fn destroy_all<K, V>(retired: impl IntoIterator<Item = RetiredEntry<K, V>>) {
    let mut first_panic = None;
    for entry in retired {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| entry.destroy())) {
            first_panic.get_or_insert(panic);
        }
    }
    if let Some(panic) = first_panic {
        panic::resume_unwind(panic);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_release(counter: &Arc<AtomicUsize>) -> Box<dyn Release<Vec<u8>>> {
        let counter = Arc::clone(counter);
        Box::new(move |_: &Vec<u8>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("a", vec![1u8, 2, 3], 3, 1, Box::new(NoRelease));

        assert_eq!(entry.key, "a");
        assert_eq!(*entry.payload, vec![1, 2, 3]);
        assert_eq!(entry.size, 3);
        assert_eq!(entry.weight, 1);
        assert_eq!(entry.refcount, 0);
        assert!(entry.indexed);
        assert!(!entry.is_pinned());
        assert!(!entry.is_destroyable());
    }

    #[test]
    fn test_destroyable_requires_both_conditions() {
        let mut entry = CacheEntry::new(1u64, vec![0u8], 1, 1, Box::new(NoRelease));

        entry.refcount = 1;
        entry.indexed = false;
        assert!(!entry.is_destroyable(), "pinned entry must survive retirement");

        entry.refcount = 0;
        entry.indexed = true;
        assert!(!entry.is_destroyable(), "indexed entry must survive with no holders");

        entry.indexed = false;
        assert!(entry.is_destroyable());
    }

    #[test]
    fn test_destroy_runs_cleanup_once_with_payload() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let mut entry = CacheEntry::new(
            7u64,
            vec![9u8; 16],
            16,
            16,
            Box::new(move |payload: &Vec<u8>| {
                seen_clone.fetch_add(payload.len(), Ordering::SeqCst);
            }),
        );
        entry.indexed = false;

        entry.into_retired().destroy();
        assert_eq!(seen.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_destroy_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let retired: Vec<_> = (0..5u64)
            .map(|key| {
                let mut entry = CacheEntry::new(key, vec![], 0, 1, counting_release(&counter));
                entry.indexed = false;
                entry.into_retired()
            })
            .collect();

        destroy_all(retired);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_destroy_all_survives_panicking_cleanup() {
        let counter = Arc::new(AtomicUsize::new(0));
        let retired: Vec<_> = (0..3u64)
            .map(|key| {
                let cleanup = if key == 1 {
                    Box::new(|_: &Vec<u8>| panic!("cleanup failed")) as Box<dyn Release<Vec<u8>>>
                } else {
                    counting_release(&counter)
                };
                let mut entry = CacheEntry::new(key, vec![], 0, 1, cleanup);
                entry.indexed = false;
                entry.into_retired()
            })
            .collect();

        let result = panic::catch_unwind(AssertUnwindSafe(|| destroy_all(retired)));
        assert!(result.is_err(), "the cleanup panic is resumed");
        assert_eq!(counter.load(Ordering::SeqCst), 2, "other entries still cleaned up");
    }
}
