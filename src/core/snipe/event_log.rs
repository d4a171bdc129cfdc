use std::hash::Hash;

use dashmap::DashMap;

use super::event_window::{EventFilter, EventWindow};

/// One `EventWindow` per partition key, created lazily on the first event.
///
/// DashMap locks the shard holding a key for the duration of each call, so
/// adds and reads on one partition never interleave while different
/// partitions stay independent.
pub struct EventLog<K, T> {
    windows: DashMap<K, EventWindow<T>>,
    capacity: usize,
}

impl<K, T> EventLog<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: DashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add(&self, key: K, event: T) {
        let capacity = self.capacity;
        self.windows
            .entry(key)
            .or_insert_with(|| EventWindow::new(capacity))
            .add(event);
    }

    pub fn get(&self, key: &K, index: usize, filter: Option<EventFilter<'_, T>>) -> Option<T> {
        self.windows
            .get(key)
            .and_then(|window| window.get(index, filter).cloned())
    }

    pub fn get_all(&self, key: &K, filter: Option<EventFilter<'_, T>>) -> Vec<T> {
        self.windows
            .get(key)
            .map(|window| window.get_all(filter).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of events held for `key` (0 for a partition that never saw one).
    pub fn len(&self, key: &K) -> usize {
        self.windows.get(key).map(|window| window.len()).unwrap_or(0)
    }

    pub fn partitions(&self) -> usize {
        self.windows.len()
    }
}
