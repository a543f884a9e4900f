//! Per-key fetch timestamp tracking for refresh debouncing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Records the last write instant per key.
///
/// One coarse lock guards every read and write of the map, independent
/// of any locking inside storage backends. Entries are never removed:
/// the map grows monotonically for the process lifetime, an accepted
/// trade-off since entries are a key plus an instant.
#[derive(Debug, Default)]
pub struct FetchTracker {
    last_fetch: Mutex<HashMap<String, Instant>>,
}

impl FetchTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record now as the last write instant for `key`.
    ///
    /// A key's tracked timestamp never moves backward: if a concurrent
    /// writer already recorded a later instant, this call keeps it.
    pub fn record(&self, key: &str) {
        let now = Instant::now();
        let mut map = self.last_fetch.lock().unwrap();
        match map.get_mut(key) {
            Some(at) if *at >= now => {}
            Some(at) => *at = now,
            None => {
                map.insert(key.to_string(), now);
            }
        }
    }

    /// Whether the debounce window has elapsed since the last recorded
    /// write for `key`.
    ///
    /// Keys with no record always pass. This check is a heuristic
    /// courtesy, not a mutual-exclusion guarantee: two concurrent calls
    /// can both pass before either records a timestamp.
    pub fn should_refresh(&self, key: &str, window: Duration) -> bool {
        let map = self.last_fetch.lock().unwrap();
        match map.get(key) {
            Some(last) => last.elapsed() > window,
            None => true,
        }
    }

    /// Last recorded write instant for `key`, if any.
    pub fn last_write(&self, key: &str) -> Option<Instant> {
        self.last_fetch.lock().unwrap().get(key).copied()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.last_fetch.lock().unwrap().len()
    }

    /// Whether no keys have been tracked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
