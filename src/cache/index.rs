//! Index Module
//!
//! Maps each owner to the slot of its currently indexed entry.

use std::collections::{HashMap, TryReserveError};
use std::hash::Hash;

// == Index ==
/// Owner key to entry slot mapping.
///
/// Holds at most one slot per owner; retired entries are never present.
#[derive(Debug)]
pub struct Index<K> {
    slots: HashMap<K, usize>,
}

impl<K> Default for Index<K> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Index<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for one more owner so that `insert` cannot allocate.
    pub fn try_reserve_one(&mut self) -> Result<(), TryReserveError> {
        self.slots.try_reserve(1)
    }

    pub fn get(&self, owner: &K) -> Option<usize> {
        self.slots.get(owner).copied()
    }

    /// Binds `owner` to `slot`, returning the slot it was previously bound to.
    pub fn insert(&mut self, owner: K, slot: usize) -> Option<usize> {
        self.slots.insert(owner, slot)
    }

    pub fn remove(&mut self, owner: &K) -> Option<usize> {
        self.slots.remove(owner)
    }

    pub fn contains(&self, owner: &K) -> bool {
        self.slots.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forgets every owner and frees the table.
    pub fn clear(&mut self) {
        self.slots = HashMap::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_insert_get_remove() {
        let mut index = Index::new();
        index.try_reserve_one().unwrap();

        assert_eq!(index.insert("a", 0), None);
        assert_eq!(index.get(&"a"), Some(0));
        assert!(index.contains(&"a"));

        assert_eq!(index.remove(&"a"), Some(0));
        assert_eq!(index.get(&"a"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_rebind_returns_previous_slot() {
        let mut index = Index::new();
        index.insert(1u64, 3);

        assert_eq!(index.insert(1u64, 8), Some(3));
        assert_eq!(index.get(&1), Some(8));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_index_clear() {
        let mut index = Index::new();
        for slot in 0..10usize {
            index.insert(slot as u64, slot);
        }

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.remove(&3), None);
    }
}
