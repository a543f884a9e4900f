//! Unbounded in-memory storage backend.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::traits::Storage;
use crate::types::CacheValue;

/// Reference in-memory implementation of [`Storage`].
///
/// An unbounded map guarded by a single mutex. There is no eviction and
/// no TTL: entries live until explicitly removed or overwritten. Change
/// detection on store compares the new value against the prior one via
/// dynamic equality, so re-storing an equal value reports no change.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, CacheValue>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether `key` has a stored entry of any type.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str, expected_type: TypeId) -> Option<CacheValue> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|value| value.as_any().type_id() == expected_type)
            .cloned()
    }

    fn store(&self, key: &str, value: CacheValue, _notify: bool) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let changed = match entries.get(key) {
            Some(prior) => !prior.eq_value(value.as_ref()),
            None => true,
        };
        entries.insert(key.to_string(), value);
        changed
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
