//! Cached Mapping Table (spec.md §4.3): a bounded LRU of LPN→PPN entries
//! with dirty bits. Built directly on `lru::LruCache`, which already
//! maintains the list + hash-table pairing the CMT needs. `push` evicts
//! the LRU tail as part of the same call that inserts the new entry,
//! fusing spec.md's `evict_one` + `insert` into one call while still
//! handing the evicted entry back to the caller for write-back.

use std::num::NonZeroUsize;

use lru::LruCache;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmtEntry {
    pub ppn: u64,
    pub dirty: bool,
}

pub struct Cmt {
    cache: LruCache<u64, CmtEntry>,
    capacity: usize,
}

impl Cmt {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Cmt {
            cache: LruCache::new(cap),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// `hit(lpn)` (spec.md §4.5): bumps recency on a present entry.
    /// Returns whether `lpn` was cached; callers re-read the actual PPN
    /// from the forward map rather than from the cached copy, since the
    /// forward map is always authoritative.
    pub fn hit(&mut self, lpn: u64) -> bool {
        self.cache.get(&lpn).is_some()
    }

    /// Peeks a present entry without disturbing LRU order.
    pub fn peek(&self, lpn: u64) -> Option<CmtEntry> {
        self.cache.peek(&lpn).copied()
    }

    /// Updates an already-cached entry's `ppn` and marks it DIRTY
    /// (spec.md §4.5/§4.7: write path and data-block GC reconciliation).
    /// Panics if `lpn` is not present — every call site inserts the entry
    /// first via `ensure_capacity_and_insert`.
    pub fn mark_dirty(&mut self, lpn: u64, ppn: u64) {
        let entry = self
            .cache
            .get_mut(&lpn)
            .unwrap_or_else(|| panic!("mark_dirty on lpn {lpn} not present in CMT"));
        entry.ppn = ppn;
        entry.dirty = true;
    }

    /// `ensure_capacity_and_insert` (spec.md §4.3): inserts `(lpn, ppn,
    /// dirty)`, evicting the LRU tail first if the cache is at capacity.
    /// Returns the evicted `(lpn, entry)` pair when an eviction occurred
    /// so the caller can write back a DIRTY entry before it is lost.
    pub fn ensure_capacity_and_insert(&mut self, lpn: u64, ppn: u64, dirty: bool) -> Option<(u64, CmtEntry)> {
        let evicted = self.cache.push(lpn, CmtEntry { ppn, dirty });
        debug_assert!(self.cache.len() <= self.capacity, "CMT used exceeds capacity");
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_insert_then_hit() {
        let mut cmt = Cmt::new(2);
        assert!(!cmt.hit(1));
        assert!(cmt.ensure_capacity_and_insert(1, 100, false).is_none());
        assert!(cmt.hit(1));
        assert_eq!(cmt.peek(1), Some(CmtEntry { ppn: 100, dirty: false }));
    }

    #[test]
    fn inserting_past_capacity_evicts_the_lru_tail() {
        let mut cmt = Cmt::new(2);
        cmt.ensure_capacity_and_insert(1, 10, false);
        cmt.ensure_capacity_and_insert(2, 20, false);
        // Touch 1 so 2 becomes the LRU tail.
        assert!(cmt.hit(1));
        let evicted = cmt.ensure_capacity_and_insert(3, 30, false);
        assert_eq!(evicted, Some((2, CmtEntry { ppn: 20, dirty: false })));
        assert_eq!(cmt.len(), 2);
        assert!(cmt.hit(1));
        assert!(cmt.hit(3));
        assert!(!cmt.hit(2));
    }

    #[test]
    fn dirty_entry_is_returned_on_eviction_for_write_back() {
        let mut cmt = Cmt::new(1);
        cmt.ensure_capacity_and_insert(1, 10, false);
        cmt.mark_dirty(1, 11);
        let evicted = cmt.ensure_capacity_and_insert(2, 20, false);
        assert_eq!(evicted, Some((1, CmtEntry { ppn: 11, dirty: true })));
    }

    #[test]
    #[should_panic(expected = "not present")]
    fn mark_dirty_on_absent_lpn_panics() {
        let mut cmt = Cmt::new(1);
        cmt.mark_dirty(42, 1);
    }
}
