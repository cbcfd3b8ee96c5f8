use indexmap::IndexMap;
use parking_lot::Mutex;

use super::Classification;

/// Bounded memo of classifier answers, least recently used evicted first.
///
/// Keys are whitespace-normalized text; two threads racing on the same key
/// both compute and store the same answer.
pub struct ClassificationCache {
    capacity: usize,
    entries: Mutex<IndexMap<String, Classification>>,
}

impl ClassificationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity.min(1024))),
        }
    }

    pub fn key(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// A hit moves the entry to the back. `move_index` shifts the entries
    /// behind it, so a hit is an O(n) memmove under the lock.
    pub fn get(&self, key: &str) -> Option<Classification> {
        if self.capacity == 0 {
            return None;
        }
        let mut entries = self.entries.lock();
        let idx = entries.get_index_of(key)?;
        let last = entries.len() - 1;
        entries.move_index(idx, last);
        entries.get_index(last).map(|(_, hit)| hit.clone())
    }

    pub fn insert(&self, key: String, value: Classification) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        let (idx, _) = entries.insert_full(key, value);
        let last = entries.len() - 1;
        entries.move_index(idx, last);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
