//! Cache orchestrator coordinating storage tiers, policy, and refresh.
//!
//! [`Cache`] is the facade of the crate. A `run` call consults the fast
//! primary storage, then the optional secondary storage, decides from the
//! effective [`Policy`] whether to call the producer synchronously, then
//! unconditionally considers scheduling a debounced background refresh so
//! subsequent callers see fresher data without paying fetch latency.
//!
//! # Concurrency
//!
//! Multiple `run` calls may execute concurrently against the same
//! orchestrator; each schedules its own background refresh independently.
//! The debounce check and the final timestamp write are not serialized
//! across calls, so two concurrent calls for the same key can both pass
//! the check and both schedule a refresh. The debounce window is a
//! heuristic courtesy, not a mutual-exclusion guarantee.
//!
//! Storage backends can be swapped with [`Cache::set_storage`], but not
//! safely while calls are in flight: an in-flight call keeps operating on
//! the backends it captured at entry.

use std::any::{Any, TypeId};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::CacheEvents;
use crate::fetch;
use crate::policy::{CacheMode, Policy};
use crate::storage::{MemoryStorage, Storage};
use crate::tracker::FetchTracker;
use crate::types::{cache_value, downcast_value, CacheError, CacheValue, Producer};

/// Delay before a changed primary write is mirrored to the secondary
/// storage. The mirror write is fire-and-forget; its outcome is not
/// observed by the caller.
const SECONDARY_WRITE_DELAY: Duration = Duration::from_millis(10);

/// Callback invoked with the fresh value after a successful background
/// refresh, before the value is written back to storage.
pub type BackgroundUpdate<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Policy-driven read-through/refresh-ahead cache.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use freshcache::{producer, Cache, CacheMode, Policy, ProducerError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), freshcache::CacheError> {
/// let cache = Cache::new();
///
/// let fetch = producer(|| async {
///     // An expensive call would live here.
///     Ok::<_, ProducerError>("fresh data".to_string())
/// });
///
/// let policy = Policy::new()
///     .with_mode(CacheMode::CacheFirst)
///     .with_update_cache_timeout(Duration::from_millis(500));
///
/// let value = cache.run("report", fetch, Some(policy), None).await?;
/// assert_eq!(value, "fresh data");
/// # Ok(())
/// # }
/// ```
pub struct Cache {
    /// Fast, first-consulted storage tier.
    primary: RwLock<Arc<dyn Storage>>,
    /// Optional slower/durable storage tier.
    secondary: RwLock<Option<Arc<dyn Storage>>>,
    /// Policy used when a call supplies none.
    default_policy: RwLock<Policy>,
    /// Per-key last-write instants for refresh debouncing.
    tracker: Arc<FetchTracker>,
    /// Lifecycle event listeners.
    events: Arc<CacheEvents>,
    /// Cancels background refreshes that have not started yet.
    shutdown: CancellationToken,
}

impl Cache {
    /// Create a cache backed by an in-memory primary storage and no
    /// secondary storage.
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()), None)
    }

    /// Create a cache with explicit storage backends.
    pub fn with_storage(
        primary: Arc<dyn Storage>,
        secondary: Option<Arc<dyn Storage>>,
    ) -> Self {
        Self {
            primary: RwLock::new(primary),
            secondary: RwLock::new(secondary),
            default_policy: RwLock::new(Policy::default()),
            tracker: Arc::new(FetchTracker::new()),
            events: Arc::new(CacheEvents::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Event registry for this cache.
    pub fn events(&self) -> &CacheEvents {
        &self.events
    }

    /// Replace the process-wide default policy.
    pub fn set_default_policy(&self, policy: Policy) {
        *self.default_policy.write().unwrap() = policy;
    }

    /// Replace the storage backends.
    ///
    /// Not safe to call while `run` calls are in flight: in-flight calls
    /// keep the backends they captured at entry.
    pub fn set_storage(&self, primary: Arc<dyn Storage>, secondary: Option<Arc<dyn Storage>>) {
        *self.primary.write().unwrap() = primary;
        *self.secondary.write().unwrap() = secondary;
    }

    /// Replace only the secondary storage backend.
    pub fn set_secondary_storage(&self, secondary: Arc<dyn Storage>) {
        *self.secondary.write().unwrap() = Some(secondary);
    }

    /// Cancel background refreshes that have not started fetching yet.
    ///
    /// A producer invocation already in flight is abandoned, not
    /// interrupted.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Store a value without policy involvement.
    ///
    /// Writes to primary storage and, when configured, mirrors to the
    /// secondary storage in the same call. This path updates no fetch
    /// timestamps and emits no update event; it is the caller-facing
    /// write, distinct from the policy-aware write `run` performs.
    ///
    /// # Errors
    ///
    /// Fails with [`CacheError::InvalidKey`] when `key` is empty.
    pub fn store<T>(&self, key: &str, value: T) -> Result<(), CacheError>
    where
        T: Any + PartialEq + Send + Sync,
    {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let value = cache_value(value);
        self.primary().store(key, value.clone(), true);
        if let Some(secondary) = self.secondary() {
            // Best-effort mirror, same call.
            secondary.store(key, value, true);
        }
        Ok(())
    }

    /// Look up a value, falling back to `T::default()` when absent.
    ///
    /// Consults primary storage first, then secondary. A secondary hit is
    /// promoted into primary before returning, so the next lookup is
    /// served from the fast tier. This is the only read path that
    /// performs write-back promotion.
    pub fn get_or_default<T>(&self, key: &str) -> T
    where
        T: Any + Clone + Default + PartialEq + Send + Sync,
    {
        let expected_type = TypeId::of::<T>();
        let primary = self.primary();

        if let Some(value) = primary.get(key, expected_type) {
            if let Some(value) = downcast_value::<T>(&value) {
                return value;
            }
        }

        if let Some(secondary) = self.secondary() {
            if let Some(value) = secondary.get(key, expected_type) {
                if let Some(concrete) = downcast_value::<T>(&value) {
                    debug!(key, "promoting secondary hit into primary");
                    primary.store(key, value, true);
                    return concrete;
                }
            }
        }

        T::default()
    }

    /// Remove `key` from both storage tiers and emit the removed event.
    ///
    /// Idempotent on a missing key.
    pub fn remove(&self, key: &str) {
        self.primary().remove(key);
        if let Some(secondary) = self.secondary() {
            secondary.remove(key);
        }
        self.events.emit_removed(key);
    }

    /// Resolve a value by key, producing and refreshing per policy.
    ///
    /// The steps, in order:
    ///
    /// 1. Resolve the effective policy (supplied, else the default).
    /// 2. Read the current value: primary, then secondary. No promotion
    ///    happens here; [`get_or_default`](Cache::get_or_default) is the
    ///    promoting read.
    /// 3. On a total miss, await the producer with no timeout and store
    ///    the result. A producer failure here propagates to the caller:
    ///    there is no cached fallback.
    /// 4. On a hit with `FetchFirst` mode (and no suppressing predicate),
    ///    re-fetch synchronously under `fetch_timeout`. Success replaces
    ///    the returned value and is stored; any failure is reported via
    ///    the error event and exception handler, and the call proceeds
    ///    with the cached value as if no refresh had been attempted.
    /// 5. Unconditionally consider scheduling a debounced background
    ///    refresh, whichever branch was taken.
    /// 6. Record the current instant for `key` in the fetch tracker.
    /// 7. Return the resolved value.
    pub async fn run<T>(
        &self,
        key: &str,
        producer: Producer<T>,
        policy: Option<Policy>,
        on_background_update: Option<BackgroundUpdate<T>>,
    ) -> Result<T, CacheError>
    where
        T: Any + Clone + PartialEq + Send + Sync,
    {
        let policy =
            policy.unwrap_or_else(|| self.default_policy.read().unwrap().clone());
        let expected_type = TypeId::of::<T>();

        let primary = self.primary();
        let secondary = self.secondary();

        let cached = primary
            .get(key, expected_type)
            .or_else(|| {
                secondary
                    .as_ref()
                    .and_then(|storage| storage.get(key, expected_type))
            })
            .and_then(|value| downcast_value::<T>(&value));

        let resolved = match cached {
            None => {
                debug!(key, "cache miss, awaiting producer");
                let value = (producer)().await.map_err(CacheError::Producer)?;
                self.write_with_policy(key, cache_value(value.clone()), &policy);
                value
            }
            Some(current) => {
                let suppressed = policy
                    .use_cache_first
                    .as_ref()
                    .map_or(false, |predicate| predicate());

                if !suppressed && policy.mode == CacheMode::FetchFirst {
                    match fetch::run_with_timeout(
                        &self.events,
                        (producer)(),
                        policy.fetch_timeout,
                    )
                    .await
                    {
                        Ok(value) => {
                            self.write_with_policy(
                                key,
                                cache_value(value.clone()),
                                &policy,
                            );
                            value
                        }
                        Err(err) => {
                            // Stale-but-valid data wins over a hard failure.
                            debug!(key, error = %err, "foreground refresh failed, serving cached value");
                            self.events.emit_error(&policy, &err);
                            if let Some(handler) = &policy.exception_handler {
                                handler(&err, true);
                            }
                            current
                        }
                    }
                } else {
                    current
                }
            }
        };

        self.schedule_background_refresh(key, producer, &policy, on_background_update);
        self.tracker.record(key);

        Ok(resolved)
    }

    /// Policy-aware write used by the `run` branches and the background
    /// refresh task.
    fn write_with_policy(&self, key: &str, value: CacheValue, policy: &Policy) {
        write_through(
            &self.tracker,
            &self.events,
            &self.primary(),
            self.secondary().as_ref(),
            key,
            value,
            policy,
        );
    }

    /// Schedule a debounced background refresh for `key`.
    ///
    /// Skipped when the policy disables background refresh or the
    /// debounce window has not elapsed since the last recorded write.
    /// The scheduled task runs independently of the call that created it.
    fn schedule_background_refresh<T>(
        &self,
        key: &str,
        producer: Producer<T>,
        policy: &Policy,
        on_update: Option<BackgroundUpdate<T>>,
    ) where
        T: Any + Clone + PartialEq + Send + Sync,
    {
        if !policy.background_refresh_enabled() {
            return;
        }

        let window = policy.update_cache_timeout;
        if !self.tracker.should_refresh(key, window) {
            debug!(key, "background refresh debounced");
            return;
        }

        debug!(key, ?window, "scheduling background refresh");

        let key = key.to_string();
        let policy = policy.clone();
        let tracker = Arc::clone(&self.tracker);
        let events = Arc::clone(&self.events);
        let primary = self.primary();
        let secondary = self.secondary();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(key, "background refresh cancelled by shutdown");
                    return;
                }
                _ = tokio::time::sleep(window) => {}
            }

            match fetch::run_with_timeout(
                &events,
                (producer)(),
                policy.background_fetch_timeout,
            )
            .await
            {
                Ok(value) => {
                    if let Some(on_update) = &on_update {
                        on_update(&value);
                    }
                    write_through(
                        &tracker,
                        &events,
                        &primary,
                        secondary.as_ref(),
                        &key,
                        cache_value(value),
                        &policy,
                    );
                }
                Err(err) => {
                    if policy.report_exceptions_on_background_fetch {
                        events.emit_error(&policy, &err);
                        if let Some(handler) = &policy.exception_handler {
                            handler(&err, true);
                        }
                    } else {
                        debug!(key, error = %err, "background refresh failed");
                    }
                }
            }
        });
    }

    fn primary(&self) -> Arc<dyn Storage> {
        self.primary.read().unwrap().clone()
    }

    fn secondary(&self) -> Option<Arc<dyn Storage>> {
        self.secondary.read().unwrap().clone()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// The policy-aware write: record the fetch timestamp, store into
/// primary, and on an actual change notify the update handler, emit the
/// update event, and mirror to the secondary storage after a short delay
/// with the do-not-renotify flag.
fn write_through(
    tracker: &FetchTracker,
    events: &CacheEvents,
    primary: &Arc<dyn Storage>,
    secondary: Option<&Arc<dyn Storage>>,
    key: &str,
    value: CacheValue,
    policy: &Policy,
) {
    tracker.record(key);

    if !primary.store(key, value.clone(), true) {
        return; // Stored state did not change
    }

    if let Some(handler) = &policy.update_handler {
        handler(key, &value);
    }
    events.emit_updated(key, &value);

    if let Some(secondary) = secondary {
        let secondary = Arc::clone(secondary);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(SECONDARY_WRITE_DELAY).await;
            secondary.store(&key, value, false);
        });
    }
}
