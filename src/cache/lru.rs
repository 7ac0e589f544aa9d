//! Recency List Module
//!
//! Implements Least Recently Used ordering over entry slots for eviction.

use std::collections::TryReserveError;

const NIL: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Link {
    /// Neighbour toward the front (more recently used)
    prev: usize,
    /// Neighbour toward the back (less recently used)
    next: usize,
    linked: bool,
}

impl Link {
    const UNLINKED: Link = Link {
        prev: NIL,
        next: NIL,
        linked: false,
    };
}

// == Recency List ==
/// Doubly-linked recency order over slot ids, linked by index.
///
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every operation is O(1); ids are the slot indices of the entry arena, so
/// the link table grows alongside it.
#[derive(Debug)]
pub struct RecencyList {
    links: Vec<Link>,
    head: usize,
    tail: usize,
    len: usize,
}

impl Default for RecencyList {
    fn default() -> Self {
        Self::new()
    }
}

impl RecencyList {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Reserve ==
    /// Makes room so that `push_front(id)` cannot allocate.
    pub fn try_reserve_id(&mut self, id: usize) -> Result<(), TryReserveError> {
        let needed = (id + 1).saturating_sub(self.links.len());
        self.links.try_reserve(needed)
    }

    // == Push Front ==
    /// Links an id that is not yet tracked at the most recently used end.
    pub fn push_front(&mut self, id: usize) {
        if id >= self.links.len() {
            self.links.resize(id + 1, Link::UNLINKED);
        }
        debug_assert!(!self.links[id].linked, "slot {} already linked", id);
        self.link_front(id);
    }

    // == Touch ==
    /// Marks a tracked id as most recently used.
    pub fn touch(&mut self, id: usize) {
        if !self.contains(id) || self.head == id {
            return;
        }
        self.unlink(id);
        self.link_front(id);
    }

    // == Remove ==
    /// Removes an id from the list. Returns false if it was not tracked.
    pub fn remove(&mut self, id: usize) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.unlink(id);
        true
    }

    // == Back ==
    /// Returns the least recently used id.
    pub fn back(&self) -> Option<usize> {
        (self.tail != NIL).then_some(self.tail)
    }

    // == Front ==
    /// Returns the most recently used id.
    pub fn front(&self) -> Option<usize> {
        (self.head != NIL).then_some(self.head)
    }

    // == Newer ==
    /// Returns the id used just after `id`, walking from back to front.
    pub fn newer(&self, id: usize) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        let prev = self.links[id].prev;
        (prev != NIL).then_some(prev)
    }

    /// Ids from least to most recently used.
    pub fn oldest_first(&self) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cursor = self.back();
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.newer(id);
        }
        ids
    }

    pub fn contains(&self, id: usize) -> bool {
        self.links.get(id).is_some_and(|link| link.linked)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every id and frees the link table.
    pub fn clear(&mut self) {
        self.links = Vec::new();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    fn link_front(&mut self, id: usize) {
        let old_head = self.head;
        self.links[id] = Link {
            prev: NIL,
            next: old_head,
            linked: true,
        };
        if old_head != NIL {
            self.links[old_head].prev = id;
        } else {
            self.tail = id;
        }
        self.head = id;
        self.len += 1;
    }

    fn unlink(&mut self, id: usize) {
        let Link { prev, next, .. } = self.links[id];
        if prev != NIL {
            self.links[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.links[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.links[id] = Link::UNLINKED;
        self.len -= 1;
    }
}
