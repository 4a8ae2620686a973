//! Victim selection bookkeeping for each eviction policy

use crate::config::EvictionPolicy;
use crate::order::KeyQueue;
use ahash::AHashMap;
use std::hash::Hash;

/// Per-policy ordering state, kept in step with the entry table.
///
/// LFU keeps one queue per access frequency. Within a bucket keys are ordered
/// by the moment they entered it, so the LFU victim is the key that reached
/// the minimum frequency first.
pub(crate) enum PolicyTracker<K: Hash + Eq> {
    Lru(KeyQueue<K>),
    Fifo(KeyQueue<K>),
    Lfu {
        buckets: AHashMap<u64, KeyQueue<K>>,
        min_frequency: u64,
    },
}

impl<K: Hash + Eq + Clone> PolicyTracker<K> {
    pub(crate) fn new(policy: EvictionPolicy) -> Self {
        match policy {
            EvictionPolicy::Lru => PolicyTracker::Lru(KeyQueue::new()),
            EvictionPolicy::Fifo => PolicyTracker::Fifo(KeyQueue::new()),
            EvictionPolicy::Lfu => PolicyTracker::Lfu {
                buckets: AHashMap::new(),
                min_frequency: 0,
            },
        }
    }

    /// Track a newly inserted key
    pub(crate) fn on_insert(&mut self, key: K) {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => queue.push_back(key),
            PolicyTracker::Lfu {
                buckets,
                min_frequency,
            } => {
                buckets.entry(0).or_insert_with(KeyQueue::new).push_back(key);
                *min_frequency = 0;
            }
        }
    }

    /// Record a hit on a key whose access count was `frequency` before the hit
    pub(crate) fn on_access(&mut self, key: &K, frequency: u64) {
        match self {
            PolicyTracker::Lru(queue) => queue.move_to_back(key),
            PolicyTracker::Fifo(_) => {}
            PolicyTracker::Lfu {
                buckets,
                min_frequency,
            } => {
                if detach(buckets, key, frequency) && *min_frequency == frequency {
                    *min_frequency = frequency + 1;
                }
                buckets
                    .entry(frequency + 1)
                    .or_insert_with(KeyQueue::new)
                    .push_back(key.clone());
            }
        }
    }

    /// Stop tracking a key removed from the table
    pub(crate) fn on_remove(&mut self, key: &K, frequency: u64) {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => {
                queue.remove(key);
            }
            PolicyTracker::Lfu { buckets, .. } => {
                // min_frequency may now point at an empty bucket; victim() rescans
                detach(buckets, key, frequency);
            }
        }
    }

    /// Pick and untrack the next key to evict
    pub(crate) fn victim(&mut self) -> Option<K> {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => queue.pop_front(),
            PolicyTracker::Lfu {
                buckets,
                min_frequency,
            } => {
                if !buckets.contains_key(&*min_frequency) {
                    *min_frequency = buckets.keys().copied().min()?;
                }
                let frequency = *min_frequency;
                let bucket = buckets.get_mut(&frequency)?;
                let key = bucket.pop_front();
                if bucket.is_empty() {
                    buckets.remove(&frequency);
                }
                key
            }
        }
    }

    /// Tracked keys in eviction order, next victim first
    pub(crate) fn ordered_keys(&self) -> Vec<&K> {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => queue.iter().collect(),
            PolicyTracker::Lfu { buckets, .. } => {
                let mut frequencies: Vec<u64> = buckets.keys().copied().collect();
                frequencies.sort_unstable();
                frequencies
                    .iter()
                    .filter_map(|f| buckets.get(f))
                    .flat_map(|bucket| bucket.iter())
                    .collect()
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => queue.len(),
            PolicyTracker::Lfu { buckets, .. } => buckets.values().map(KeyQueue::len).sum(),
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            PolicyTracker::Lru(queue) | PolicyTracker::Fifo(queue) => queue.clear(),
            PolicyTracker::Lfu {
                buckets,
                min_frequency,
            } => {
                buckets.clear();
                *min_frequency = 0;
            }
        }
    }
}

/// Remove a key from its frequency bucket. Returns true if the bucket emptied.
fn detach<K: Hash + Eq>(buckets: &mut AHashMap<u64, KeyQueue<K>>, key: &K, frequency: u64) -> bool {
    let Some(bucket) = buckets.get_mut(&frequency) else {
        return false;
    };
    bucket.remove(key);
    if bucket.is_empty() {
        buckets.remove(&frequency);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_victim_follows_access() {
        let mut tracker = PolicyTracker::new(EvictionPolicy::Lru);
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_access(&"a", 0);
        assert_eq!(tracker.victim(), Some("b"));
        assert_eq!(tracker.victim(), Some("a"));
        assert_eq!(tracker.victim(), None);
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut tracker = PolicyTracker::new(EvictionPolicy::Fifo);
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_access(&"a", 0);
        assert_eq!(tracker.victim(), Some("a"));
    }

    #[test]
    fn test_lfu_min_frequency_tracking() {
        let mut tracker = PolicyTracker::new(EvictionPolicy::Lfu);
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_access(&"a", 0);
        tracker.on_access(&"b", 0);
        tracker.on_access(&"b", 1);

        // a at 1, b at 2
        assert_eq!(tracker.ordered_keys(), vec![&"a", &"b"]);
        assert_eq!(tracker.victim(), Some("a"));
        assert_eq!(tracker.victim(), Some("b"));
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_lfu_rescans_after_removal() {
        let mut tracker = PolicyTracker::new(EvictionPolicy::Lfu);
        tracker.on_insert("a");
        tracker.on_insert("b");
        tracker.on_access(&"b", 0);
        tracker.on_access(&"b", 1);
        tracker.on_remove(&"a", 0);

        assert_eq!(tracker.victim(), Some("b"));
    }
}
