//! Storage capability consumed by the cache orchestrator.

use std::any::TypeId;

use crate::types::CacheValue;

/// Pluggable key/value storage backend.
///
/// The orchestrator wires one fast primary backend and at most one
/// slower/durable secondary backend, both behind this trait.
/// Implementations are responsible for their own internal thread safety;
/// the orchestrator imposes no locking of its own on storage calls.
///
/// Absence (`None`) is the miss signal throughout: a backend must report
/// "no such key" distinctly from "key exists with an empty value".
pub trait Storage: Send + Sync {
    /// Look up `key`, expecting a value of `expected_type`.
    ///
    /// Returns `None` when the key is missing or the stored value has a
    /// different concrete type than expected.
    fn get(&self, key: &str, expected_type: TypeId) -> Option<CacheValue>;

    /// Store `value` under `key`, replacing any prior value.
    ///
    /// Returns whether the stored value is new or differs from the prior
    /// value. `notify` is a hint the backend may use to suppress its own
    /// listeners: secondary propagation passes `false` so a mirror write
    /// does not retrigger the same update semantics as a fresh write.
    fn store(&self, key: &str, value: CacheValue, notify: bool) -> bool;

    /// Remove the entry for `key`. Idempotent on a missing key.
    fn remove(&self, key: &str);
}

/// Storage backend that never stores anything.
///
/// Always reports misses and no-change writes. Useful for disabling a
/// tier without rewiring call sites and for exercising producer paths in
/// tests without caching in the way.
#[derive(Debug, Clone, Default)]
pub struct NoOpStorage;

impl NoOpStorage {
    /// Create a new no-op storage backend.
    pub fn new() -> Self {
        Self
    }
}

impl Storage for NoOpStorage {
    fn get(&self, _key: &str, _expected_type: TypeId) -> Option<CacheValue> {
        None // Always miss
    }

    fn store(&self, _key: &str, _value: CacheValue, _notify: bool) -> bool {
        false // Accept but don't store, so never report a change
    }

    fn remove(&self, _key: &str) {
        // Nothing to remove
    }
}
