//! Observable cache lifecycle events.
//!
//! The orchestrator multicasts four event streams: producer failures,
//! value updates, removals, and loading-state changes. Listeners are
//! registered explicitly and invoked synchronously, in registration
//! order, on the task performing the triggering operation. Delivery is
//! best-effort with no guarantee beyond that synchronous invocation.

use std::sync::{Arc, RwLock};

use crate::policy::Policy;
use crate::types::{CacheError, CacheValue};

/// Listener for caught producer failures.
pub type ErrorListener = Arc<dyn Fn(&Policy, &CacheError) + Send + Sync>;

/// Listener for writes that changed stored state.
pub type UpdatedListener = Arc<dyn Fn(&str, &CacheValue) + Send + Sync>;

/// Listener for key removals.
pub type RemovedListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Listener for loading-state changes.
pub type LoadingListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Multicast listener registry for cache lifecycle events.
#[derive(Default)]
pub struct CacheEvents {
    on_error: RwLock<Vec<ErrorListener>>,
    on_updated: RwLock<Vec<UpdatedListener>>,
    on_removed: RwLock<Vec<RemovedListener>>,
    on_loading: RwLock<Vec<LoadingListener>>,
}

impl CacheEvents {
    /// Create an empty event registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for caught producer failures.
    ///
    /// The listener receives the policy in effect for the failing call.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&Policy, &CacheError) + Send + Sync + 'static,
    {
        self.on_error.write().unwrap().push(Arc::new(listener));
    }

    /// Register a listener for writes that changed stored state.
    pub fn on_updated<F>(&self, listener: F)
    where
        F: Fn(&str, &CacheValue) + Send + Sync + 'static,
    {
        self.on_updated.write().unwrap().push(Arc::new(listener));
    }

    /// Register a listener for key removals.
    pub fn on_removed<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_removed.write().unwrap().push(Arc::new(listener));
    }

    /// Register a listener for loading-state changes.
    ///
    /// Fired with `true` when a timeout-bounded producer call starts and
    /// `false` exactly once when it ends, on either exit path.
    pub fn on_loading<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_loading.write().unwrap().push(Arc::new(listener));
    }

    pub(crate) fn emit_error(&self, policy: &Policy, error: &CacheError) {
        for listener in self.on_error.read().unwrap().iter() {
            listener(policy, error);
        }
    }

    pub(crate) fn emit_updated(&self, key: &str, value: &CacheValue) {
        for listener in self.on_updated.read().unwrap().iter() {
            listener(key, value);
        }
    }

    pub(crate) fn emit_removed(&self, key: &str) {
        for listener in self.on_removed.read().unwrap().iter() {
            listener(key);
        }
    }

    pub(crate) fn emit_loading(&self, loading: bool) {
        for listener in self.on_loading.read().unwrap().iter() {
            listener(loading);
        }
    }
}
