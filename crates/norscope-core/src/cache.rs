//! Bounded least-recently-used cache and sector revision counters
//!
//! [`LruCache`] keeps entries on an index-linked list stored in a slab, with a
//! hash index from key to slot. Both `get` and `put` move the entry to the
//! most-recently-used end in O(1); once a `put` pushes the cache over its
//! bound, entries are evicted from the least-recently-used end.
//!
//! The cache is not synchronized. Callers that share one across threads
//! must serialize access themselves.
//!
//! [`RevisionTable`] holds one counter per sector. Render caches key their
//! entries on the counter value, so bumping it after a program or erase
//! makes every stale entry unreachable without an explicit purge.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::addressing::{validate_sector, SECTOR_COUNT, SECTOR_SIZE};
use crate::error::Result;
use crate::memory::MemoryModel;

/// Default bound for general purpose caches
pub const DEFAULT_MAX_ITEMS: usize = 64;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded key/value store with exact LRU eviction
pub struct LruCache<K, V> {
    max_items: usize,
    index: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `max_items` entries
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Configured bound
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Change the bound, evicting immediately if the cache is now too big
    pub fn set_max_items(&mut self, max_items: usize) {
        self.max_items = max_items;
        self.evict_overflow();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `key` is present, without touching recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Look up `key` and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.detach(idx);
        self.push_front(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Look up `key` without changing recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Insert or replace `key`, mark it most recently used, and evict
    /// least-recently-used entries while over the bound
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.value = value;
            }
            self.detach(idx);
            self.push_front(idx);
        } else {
            let slot = Slot {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            };
            let idx = match self.free.pop() {
                Some(idx) => {
                    self.slots[idx] = Some(slot);
                    idx
                }
                None => {
                    self.slots.push(Some(slot));
                    self.slots.len() - 1
                }
            };
            self.index.insert(key, idx);
            self.push_front(idx);
        }
        self.evict_overflow();
    }

    /// Remove `key`, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.take_slot(idx).map(|slot| slot.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let slot = self.slots[cursor?].as_ref()?;
            cursor = slot.next;
            Some(&slot.key)
        })
    }

    fn evict_overflow(&mut self) {
        while self.index.len() > self.max_items {
            let Some(idx) = self.tail else { break };
            if let Some(slot) = self.take_slot(idx) {
                self.index.remove(&slot.key);
                log::trace!("lru: evicted slot {}", idx);
            }
        }
    }

    fn take_slot(&mut self, idx: usize) -> Option<Slot<K, V>> {
        self.detach(idx);
        let slot = self.slots[idx].take();
        if slot.is_some() {
            self.free.push(idx);
        }
        slot
    }

    fn links(&self, idx: usize) -> (Option<usize>, Option<usize>) {
        self.slots[idx]
            .as_ref()
            .map_or((None, None), |slot| (slot.prev, slot.next))
    }

    fn set_prev(&mut self, idx: usize, prev: Option<usize>) {
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = prev;
        }
    }

    fn set_next(&mut self, idx: usize, next: Option<usize>) {
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.next = next;
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = self.links(idx);
        match prev {
            Some(p) => self.set_next(p, next),
            None if self.head == Some(idx) => self.head = next,
            None => {}
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None if self.tail == Some(idx) => self.tail = prev,
            None => {}
        }
        self.set_prev(idx, None);
        self.set_next(idx, None);
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        self.set_prev(idx, None);
        self.set_next(idx, old_head);
        if let Some(h) = old_head {
            self.set_prev(h, Some(idx));
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

/// Per-sector modification counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTable {
    revisions: Vec<u64>,
}

impl RevisionTable {
    /// All sectors at revision 0
    pub fn new() -> Self {
        Self {
            revisions: vec![0; SECTOR_COUNT as usize],
        }
    }

    /// Current revision of a sector
    pub fn revision(&self, sector_id: u32) -> Result<u64> {
        validate_sector(sector_id)?;
        Ok(self.revisions[sector_id as usize])
    }

    /// Bump one sector, returning its new revision
    pub fn bump_sector(&mut self, sector_id: u32) -> Result<u64> {
        validate_sector(sector_id)?;
        let rev = &mut self.revisions[sector_id as usize];
        *rev += 1;
        Ok(*rev)
    }

    /// Bump every sector touched by `start..start+size`
    pub fn bump_range(&mut self, start: u32, size: usize) -> Result<()> {
        MemoryModel::validate_region(start, size)?;
        if size == 0 {
            return Ok(());
        }
        let first = start / SECTOR_SIZE;
        let last = ((start as u64 + size as u64 - 1) / SECTOR_SIZE as u64) as u32;
        for sector in first..=last {
            self.revisions[sector as usize] += 1;
        }
        log::trace!("revisions bumped for sectors {}..={}", first, last);
        Ok(())
    }

    /// Bump every sector, e.g. after loading a whole image
    pub fn bump_all(&mut self) {
        for rev in &mut self.revisions {
            *rev += 1;
        }
    }
}

impl Default for RevisionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(cache: &LruCache<u32, &'static str>) -> Vec<u32> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");
        assert!(!cache.contains(&1));
        assert_eq!(cache.len(), 2);
        assert_eq!(keys(&cache), vec![3, 2]);
    }

    #[test]
    fn test_get_prevents_eviction() {
        let mut cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.get(&1), Some(&"a"));
        cache.put(3, "c");
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(keys(&cache), vec![3, 1]);
    }

    #[test]
    fn test_put_existing_promotes_and_replaces() {
        let mut cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(1, "z");
        cache.put(3, "c");
        assert_eq!(cache.peek(&1), Some(&"z"));
        assert!(!cache.contains(&2));
    }

    #[test]
    fn test_peek_does_not_promote() {
        let mut cache = LruCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.peek(&1), Some(&"a"));
        cache.put(3, "c");
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_miss_returns_none() {
        let mut cache: LruCache<u32, &str> = LruCache::new(4);
        assert_eq!(cache.get(&7), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_slot_reuse() {
        let mut cache = LruCache::new(3);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");
        assert_eq!(cache.remove(&2), Some("b"));
        assert_eq!(keys(&cache), vec![3, 1]);
        cache.put(4, "d");
        assert_eq!(keys(&cache), vec![4, 3, 1]);
        cache.put(5, "e");
        assert_eq!(keys(&cache), vec![5, 4, 3]);
    }

    #[test]
    fn test_shrinking_bound_evicts() {
        let mut cache = LruCache::new(4);
        for k in 0..4 {
            cache.put(k, "x");
        }
        cache.set_max_items(1);
        assert_eq!(keys(&cache), vec![3]);
    }

    #[test]
    fn test_clear() {
        let mut cache = LruCache::new(4);
        cache.put(1, "a");
        cache.clear();
        assert!(cache.is_empty());
        cache.put(2, "b");
        assert_eq!(keys(&cache), vec![2]);
    }

    #[test]
    fn test_single_entry_churn() {
        let mut cache = LruCache::new(1);
        for k in 0..100u32 {
            cache.put(k, "v");
            assert_eq!(keys(&cache), vec![k]);
        }
    }

    #[test]
    fn test_revision_bumps() {
        let mut revs = RevisionTable::new();
        assert_eq!(revs.revision(0).unwrap(), 0);
        revs.bump_range(0xFFFF, 2).unwrap();
        assert_eq!(revs.revision(0).unwrap(), 1);
        assert_eq!(revs.revision(1).unwrap(), 1);
        assert_eq!(revs.revision(2).unwrap(), 0);

        revs.bump_range(0x2_0000, 0).unwrap();
        assert_eq!(revs.revision(2).unwrap(), 0);

        assert_eq!(revs.bump_sector(511).unwrap(), 1);
        assert!(revs.bump_sector(512).is_err());
        assert!(revs.bump_range(0x01FF_FFFF, 2).is_err());

        revs.bump_all();
        assert_eq!(revs.revision(0).unwrap(), 2);
    }
}
