//! Fixed-capacity LRU cache.
//!
//! A hash map points into a slab-backed doubly linked list, giving O(1)
//! get, put and eviction. The sketch family uses it to memoize permuted
//! hash vectors keyed by element digest, but the container is generic.

use std::collections::HashMap;
use std::hash::Hash;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Capacity must be non-zero; a zero-sized cache cannot hold the
    /// entry it is about to return.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        LruCache {
            capacity,
            map: HashMap::with_capacity(capacity.min(1024)),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Look up a key and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let slot = *self.map.get(key)?;
        self.detach(slot);
        self.attach_front(slot);
        // Slot presence is guaranteed by the map invariant.
        Some(self.slots[slot].as_ref().unwrap().value.clone())
    }

    /// Insert or refresh a key, evicting the least recently used entry
    /// when the cache is full.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&slot) = self.map.get(&key) {
            self.slots[slot].as_mut().unwrap().value = value;
            self.detach(slot);
            self.attach_front(slot);
            return;
        }
        if self.map.len() == self.capacity {
            self.evict_tail();
        }
        let entry = Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.map.insert(key, slot);
        self.attach_front(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = self.slots[slot].as_ref().unwrap();
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
        let entry = self.slots[slot].as_mut().unwrap();
        entry.prev = None;
        entry.next = None;
    }

    fn attach_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let entry = self.slots[slot].as_mut().unwrap();
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn evict_tail(&mut self) {
        let Some(slot) = self.tail else { return };
        self.detach(slot);
        let entry = self.slots[slot].take().unwrap();
        self.map.remove(&entry.key);
        self.free.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::LruCache;

    #[test]
    fn put_then_get_round_trips() {
        let mut cache: LruCache<u64, Vec<u64>> = LruCache::new(4);
        cache.put(7, vec![1, 2, 3]);
        assert_eq!(cache.get(&7), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&8), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut cache: LruCache<u64, u64> = LruCache::new(3);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);
        cache.put(4, 40);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2) && cache.contains(&3) && cache.contains(&4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache: LruCache<u64, u64> = LruCache::new(3);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);
        assert_eq!(cache.get(&1), Some(10));
        cache.put(4, 40);
        // 2 was the least recently used after the get on 1.
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
    }

    #[test]
    fn put_replaces_and_refreshes_existing_keys() {
        let mut cache: LruCache<u64, u64> = LruCache::new(2);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(1, 11);
        cache.put(3, 30);
        assert_eq!(cache.get(&1), Some(11));
        assert!(!cache.contains(&2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn capacity_one_keeps_only_the_newest() {
        let mut cache: LruCache<u64, u64> = LruCache::new(1);
        for i in 0..10 {
            cache.put(i, i * 10);
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&9), Some(90));
    }

    #[test]
    fn slots_are_reused_after_eviction() {
        let mut cache: LruCache<u64, u64> = LruCache::new(2);
        for i in 0..100 {
            cache.put(i, i);
        }
        // Only two slab slots should ever exist.
        assert_eq!(cache.slots.len(), 2);
        assert_eq!(cache.len(), 2);
    }
}
