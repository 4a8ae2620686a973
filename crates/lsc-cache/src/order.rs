//! Ordered key set used by the eviction policies
//!
//! `LruCache` already is a hash map threaded through a linked list, so an
//! unbounded instance with unit values gives O(1) append, move-to-back,
//! removal by key and pop-front.

use ahash::RandomState;
use lru::LruCache;
use std::hash::Hash;

pub(crate) struct KeyQueue<K: Hash + Eq> {
    keys: LruCache<K, (), RandomState>,
}

impl<K: Hash + Eq> KeyQueue<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: LruCache::unbounded_with_hasher(RandomState::new()),
        }
    }

    /// Append a key, moving it to the back if already queued
    pub(crate) fn push_back(&mut self, key: K) {
        self.keys.put(key, ());
    }

    pub(crate) fn move_to_back(&mut self, key: &K) {
        self.keys.promote(key);
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        self.keys.pop(key).is_some()
    }

    pub(crate) fn pop_front(&mut self) -> Option<K> {
        self.keys.pop_lru().map(|(key, _)| key)
    }

    /// Keys from front (oldest) to back (newest)
    pub(crate) fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter().rev().map(|(key, _)| key)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_order() {
        let mut queue = KeyQueue::new();
        queue.push_back("a");
        queue.push_back("b");
        queue.push_back("c");
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        queue.move_to_back(&"a");
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec!["b", "c", "a"]);

        assert!(queue.remove(&"c"));
        assert!(!queue.remove(&"c"));
        assert_eq!(queue.pop_front(), Some("b"));
        assert_eq!(queue.pop_front(), Some("a"));
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_existing_moves_to_back() {
        let mut queue = KeyQueue::new();
        queue.push_back(1);
        queue.push_back(2);
        queue.push_back(1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
    }
}
