//! Cache Store Module
//!
//! Main cache engine combining the owner index with LRU tracking, capacity
//! enforcement and deferred destruction of pinned entries.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::cache::entry::{destroy_all, CacheEntry, Release, RetiredEntry};
use crate::cache::{CacheItem, CacheStats, Index, RecencyList};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Store state shared between the store and every handle it hands out.
pub(crate) type Shared<K, V> = Arc<Mutex<StoreState<K, V>>>;

// == Store State ==
/// Everything guarded by the structural lock.
pub(crate) struct StoreState<K, V> {
    /// Entry arena; a slot stays occupied until its entry is destroyed
    slots: Vec<Option<CacheEntry<K, V>>>,
    /// Vacant slots available for reuse
    free: Vec<usize>,
    index: Index<K>,
    recency: RecencyList,
    config: CacheConfig,
    /// Sum of the weights of indexed entries, wide enough that byte weights
    /// of pinned entries cannot overflow it
    weight: u128,
    stats: CacheStats,
    closed: bool,
}

impl<K, V> StoreState<K, V> {
    fn entry(&self, slot: usize) -> &CacheEntry<K, V> {
        match self.slots.get(slot) {
            Some(Some(entry)) => entry,
            _ => unreachable!("cache slot {} is vacant", slot),
        }
    }

    fn entry_mut(&mut self, slot: usize) -> &mut CacheEntry<K, V> {
        match self.slots.get_mut(slot) {
            Some(Some(entry)) => entry,
            _ => unreachable!("cache slot {} is vacant", slot),
        }
    }

    /// Vacates a destroyable slot and hands its entry over for cleanup.
    fn take(&mut self, slot: usize) -> RetiredEntry<K, V> {
        let entry = match self.slots.get_mut(slot).and_then(Option::take) {
            Some(entry) => entry,
            None => unreachable!("cache slot {} is vacant", slot),
        };
        self.free.push(slot);
        self.stats.record_destroyed();
        entry.into_retired()
    }

    // == Release ==
    /// Drops one pin on `slot`.
    ///
    /// Returns the entry when this was the last pin of a retired entry.
    pub(crate) fn release(&mut self, slot: usize) -> Option<RetiredEntry<K, V>> {
        let entry = self.entry_mut(slot);
        debug_assert!(entry.refcount > 0, "released an unpinned entry");
        entry.refcount -= 1;
        if entry.is_destroyable() {
            debug!("Last handle released for retired entry in slot {}", slot);
            Some(self.take(slot))
        } else {
            None
        }
    }
}

impl<K, V> StoreState<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn new(config: CacheConfig) -> Self {
        let mut stats = CacheStats::new();
        stats.capacity = config.capacity;
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: Index::new(),
            recency: RecencyList::new(),
            config,
            weight: 0,
            stats,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    // == Reserve ==
    /// Grows every structure an insertion touches, before anything is mutated.
    fn reserve_insert(&mut self) -> Result<()> {
        self.index
            .try_reserve_one()
            .map_err(|source| CacheError::AllocationFailed {
                what: "owner index",
                source,
            })?;

        let slot = match self.free.last() {
            Some(&slot) => slot,
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|source| CacheError::AllocationFailed {
                        what: "entry arena",
                        source,
                    })?;
                self.slots.len()
            }
        };

        // The free list must be able to hold every slot without growing
        let spare = self.slots.len() + 1 - self.free.len();
        self.free
            .try_reserve(spare)
            .map_err(|source| CacheError::AllocationFailed {
                what: "free slot list",
                source,
            })?;

        self.recency
            .try_reserve_id(slot)
            .map_err(|source| CacheError::AllocationFailed {
                what: "recency list",
                source,
            })
    }

    fn alloc(&mut self, entry: CacheEntry<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        }
    }

    // == Retire ==
    /// Unindexes the entry in `slot`.
    ///
    /// Unpinned entries are pushed to `out` for destruction; pinned ones stay
    /// in the arena until their last handle is released.
    fn retire(&mut self, slot: usize, out: &mut Vec<RetiredEntry<K, V>>) {
        let entry = match self.slots.get_mut(slot) {
            Some(Some(entry)) => entry,
            _ => unreachable!("cache slot {} is vacant", slot),
        };
        debug_assert!(entry.indexed, "retired an unindexed entry");
        entry.indexed = false;
        self.index.remove(&entry.key);
        self.recency.remove(slot);
        self.weight -= u128::from(entry.weight);

        if entry.is_pinned() {
            debug!(
                "Deferring destruction of {:?}: {} handle(s) outstanding",
                entry.key, entry.refcount
            );
            self.stats.record_deferred();
        } else {
            out.push(self.take(slot));
        }
    }

    // == Enforce Capacity ==
    /// Evicts unpinned entries, least recently used first, until the indexed
    /// weight fits the capacity. Pinned entries are skipped, never waited on.
    fn enforce_capacity(&mut self, out: &mut Vec<RetiredEntry<K, V>>) {
        let mut cursor = self.recency.back();
        while self.weight > u128::from(self.config.capacity) {
            let Some(slot) = cursor else {
                debug!(
                    "Capacity {} exceeded at weight {}: remaining entries are pinned",
                    self.config.capacity, self.weight
                );
                break;
            };
            cursor = self.recency.newer(slot);

            let entry = self.entry(slot);
            if entry.is_pinned() {
                continue;
            }
            debug!("Evicting least recently used entry {:?}", entry.key);
            self.retire(slot, out);
            self.stats.record_eviction();
        }
    }

    /// Indexed weight, saturated to `u64::MAX`.
    fn indexed_weight(&self) -> u64 {
        u64::try_from(self.weight).unwrap_or(u64::MAX)
    }

    fn snapshot(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.entries = self.index.len();
        stats.weight = self.indexed_weight();
        stats.capacity = self.config.capacity;
        for entry in self.slots.iter().flatten() {
            if entry.is_pinned() {
                if entry.indexed {
                    stats.pinned += 1;
                } else {
                    stats.retired_pinned += 1;
                }
            }
        }
        stats
    }
}

impl<K, V> Drop for StoreState<K, V> {
    fn drop(&mut self) {
        // No handle can be alive here: each one keeps the state reachable
        destroy_all(self.slots.drain(..).flatten().map(|mut entry| {
            entry.indexed = false;
            entry.into_retired()
        }));
    }
}

// == Cache Store ==
/// Bounded, reference-counted object cache with LRU eviction.
///
/// Cloning the store yields another reference to the same cache.
pub struct CacheStore<K, V> {
    shared: Shared<K, V>,
}

impl<K, V> Clone for CacheStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    // == Constructor ==
    /// Creates a new CacheStore with the default capacity.
    pub fn new() -> Self {
        Self::build(CacheConfig::default())
    }

    /// Creates a new CacheStore with the given capacity policy.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] when the capacity is above
    /// what the weighing policy accepts.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate_capacity(config.capacity)?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        info!(
            "Cache store initialized: capacity={} {}",
            config.capacity, config.weighing
        );
        Self {
            shared: Arc::new(Mutex::new(StoreState::new(config))),
        }
    }

    // == Set Capacity ==
    /// Changes the capacity limit.
    ///
    /// Takes effect on the next enforcement pass; nothing is evicted now.
    pub fn set_capacity(&self, limit: u64) -> Result<()> {
        let mut state = self.shared.lock();
        state.ensure_open()?;
        state.config.validate_capacity(limit)?;
        debug!(
            "Cache capacity changed from {} to {}",
            state.config.capacity, limit
        );
        state.config.capacity = limit;
        Ok(())
    }

    // == Put ==
    /// Installs `payload` as the cached data of `owner`.
    ///
    /// An entry already indexed for `owner` is retired; handles to it keep
    /// reading the old payload. The new entry becomes most recently used and
    /// capacity is then enforced, which may evict the new entry itself when
    /// everything older is pinned.
    ///
    /// # Arguments
    /// * `owner` - Identity of the object the data belongs to
    /// * `payload` - The data to cache
    /// * `size` - Caller-supplied size, charged as weight under byte weighing
    /// * `cleanup` - Run exactly once when the entry is destroyed
    pub fn put<R>(&self, owner: K, payload: V, size: u64, cleanup: R) -> Result<()>
    where
        R: Release<V> + 'static,
    {
        let mut retired = Vec::new();
        {
            let mut state = self.shared.lock();
            state.ensure_open()?;
            state.reserve_insert()?;

            if let Some(previous) = state.index.get(&owner) {
                trace!("Replacing cached entry for {:?}", owner);
                state.retire(previous, &mut retired);
                state.stats.record_replacement();
            }

            let weight = state.config.weighing.weigh(size);
            let entry = CacheEntry::new(owner.clone(), payload, size, weight, Box::new(cleanup));
            let slot = state.alloc(entry);
            state.index.insert(owner, slot);
            state.recency.push_front(slot);
            state.weight += u128::from(weight);
            state.stats.record_insertion();

            state.enforce_capacity(&mut retired);
        }
        destroy_all(retired);
        Ok(())
    }

    // == Get ==
    /// Looks up the cached data of `owner`.
    ///
    /// Returns `Ok(None)` on a miss. A hit pins the entry and marks it most
    /// recently used; it stays pinned until the returned handle is released.
    pub fn get(&self, owner: &K) -> Result<Option<CacheItem<K, V>>> {
        let mut state = self.shared.lock();
        state.ensure_open()?;

        let Some(slot) = state.index.get(owner) else {
            trace!("Cache miss for {:?}", owner);
            state.stats.record_miss();
            return Ok(None);
        };

        state.recency.touch(slot);
        state.stats.record_hit();
        let entry = state.entry_mut(slot);
        entry.refcount += 1;
        trace!("Cache hit for {:?} (refcount={})", owner, entry.refcount);

        Ok(Some(CacheItem::new(
            Arc::clone(&self.shared),
            slot,
            Arc::clone(&entry.payload),
            entry.size,
        )))
    }

    // == Purge ==
    /// Invalidates the entry of `owner` regardless of recency or pins.
    ///
    /// Purging an owner with no indexed entry is a no-op.
    pub fn purge(&self, owner: &K) -> Result<()> {
        let mut retired = Vec::new();
        {
            let mut state = self.shared.lock();
            state.ensure_open()?;
            if let Some(slot) = state.index.get(owner) {
                debug!("Purging cached entry for {:?}", owner);
                state.retire(slot, &mut retired);
                state.stats.record_purge();
            }
        }
        destroy_all(retired);
        Ok(())
    }

    // == Close ==
    /// Tears the store down.
    ///
    /// Every indexed entry is retired; unpinned ones are destroyed now, pinned
    /// ones when their last handle is released. Any further use of the store
    /// fails with [`CacheError::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut retired = Vec::new();
        let deferred = {
            let mut state = self.shared.lock();
            state.ensure_open()?;
            state.closed = true;

            for slot in state.recency.oldest_first() {
                state.retire(slot, &mut retired);
            }
            state.index.clear();
            state.recency.clear();

            let snapshot = state.snapshot();
            snapshot.retired_pinned
        };

        info!(
            "Cache store closed: destroying {} entries, {} still held by handles",
            retired.len(),
            deferred
        );
        destroy_all(retired);
        Ok(())
    }

    // == Introspection ==
    /// Returns true if `owner` has an indexed entry. Does not affect recency.
    pub fn contains(&self, owner: &K) -> bool {
        self.shared.lock().index.contains(owner)
    }

    /// Returns the number of indexed entries.
    pub fn len(&self) -> usize {
        self.shared.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the summed weight of indexed entries, saturated to `u64::MAX`.
    pub fn weight(&self) -> u64 {
        self.shared.lock().indexed_weight()
    }

    pub fn config(&self) -> CacheConfig {
        self.shared.lock().config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.shared.lock().snapshot()
    }
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for CacheStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("CacheStore")
            .field("entries", &state.index.len())
            .field("weight", &state.indexed_weight())
            .field("config", &state.config)
            .field("closed", &state.closed)
            .finish()
    }
}
