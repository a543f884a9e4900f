//! Per-call cache behaviour configuration.
//!
//! A [`Policy`] is resolved once per `run` call and treated as immutable
//! for the duration of that call. The orchestrator holds a process-wide
//! default policy that is used when a call supplies none.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{CacheError, CacheValue};

/// Default bound on synchronous (foreground) producer calls.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on background producer calls.
pub const DEFAULT_BACKGROUND_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Refresh behaviour on a cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Return the cached value without a synchronous re-fetch.
    CacheFirst,
    /// Synchronously re-validate against the producer on every hit,
    /// trading latency for freshness.
    FetchFirst,
}

/// Predicate suppressing the `FetchFirst` synchronous re-fetch for a call.
pub type CacheFirstPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Callback invoked when a write actually changes stored state.
pub type UpdateHandler = Arc<dyn Fn(&str, &CacheValue) + Send + Sync>;

/// Callback invoked on any caught producer failure.
///
/// The second argument reports whether the failure occurred on a
/// background fetch.
pub type ExceptionHandler = Arc<dyn Fn(&CacheError, bool) + Send + Sync>;

/// Immutable-per-call cache policy.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use freshcache::{CacheMode, Policy};
///
/// let policy = Policy::new()
///     .with_mode(CacheMode::FetchFirst)
///     .with_fetch_timeout(Duration::from_secs(5))
///     .with_update_cache_timeout(Duration::from_millis(500));
/// ```
#[derive(Clone)]
pub struct Policy {
    /// Refresh mode on a cache hit.
    pub mode: CacheMode,
    /// When present and true, suppresses the `FetchFirst` synchronous
    /// re-fetch for this call even if `mode` says `FetchFirst`.
    pub use_cache_first: Option<CacheFirstPredicate>,
    /// Bound on synchronous producer calls.
    pub fetch_timeout: Duration,
    /// Bound on background producer calls.
    pub background_fetch_timeout: Duration,
    /// Debounce window: minimum interval since the last recorded write to
    /// a key before a new background refresh is scheduled. Zero disables
    /// background refresh entirely.
    pub update_cache_timeout: Duration,
    /// Whether background-refresh failures are surfaced via the error
    /// event and exception handler.
    pub report_exceptions_on_background_fetch: bool,
    /// Invoked synchronously whenever a write actually changes stored
    /// state.
    pub update_handler: Option<UpdateHandler>,
    /// Invoked on any caught producer failure.
    pub exception_handler: Option<ExceptionHandler>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mode: CacheMode::CacheFirst,
            use_cache_first: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            background_fetch_timeout: DEFAULT_BACKGROUND_FETCH_TIMEOUT,
            update_cache_timeout: Duration::ZERO,
            report_exceptions_on_background_fetch: false,
            update_handler: None,
            exception_handler: None,
        }
    }
}

impl Policy {
    /// Create a policy with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the refresh mode.
    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set a predicate that suppresses the `FetchFirst` synchronous
    /// re-fetch when it evaluates true.
    pub fn with_use_cache_first<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.use_cache_first = Some(Arc::new(predicate));
        self
    }

    /// Set the synchronous fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the background fetch timeout.
    pub fn with_background_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.background_fetch_timeout = timeout;
        self
    }

    /// Set the debounce window for background refresh scheduling.
    ///
    /// A zero duration disables background refresh.
    pub fn with_update_cache_timeout(mut self, window: Duration) -> Self {
        self.update_cache_timeout = window;
        self
    }

    /// Set whether background-refresh failures are reported.
    pub fn with_report_background_exceptions(mut self, report: bool) -> Self {
        self.report_exceptions_on_background_fetch = report;
        self
    }

    /// Set a callback invoked when a write changes stored state.
    pub fn with_update_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &CacheValue) + Send + Sync + 'static,
    {
        self.update_handler = Some(Arc::new(handler));
        self
    }

    /// Set a callback invoked on any caught producer failure.
    pub fn with_exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CacheError, bool) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    /// Whether background refresh is enabled for this policy.
    pub fn background_refresh_enabled(&self) -> bool {
        !self.update_cache_timeout.is_zero()
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("mode", &self.mode)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("background_fetch_timeout", &self.background_fetch_timeout)
            .field("update_cache_timeout", &self.update_cache_timeout)
            .field(
                "report_exceptions_on_background_fetch",
                &self.report_exceptions_on_background_fetch,
            )
            .field("use_cache_first", &self.use_cache_first.is_some())
            .field("update_handler", &self.update_handler.is_some())
            .field("exception_handler", &self.exception_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults() {
        let policy = Policy::default();

        assert_eq!(policy.mode, CacheMode::CacheFirst);
        assert_eq!(policy.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(
            policy.background_fetch_timeout,
            DEFAULT_BACKGROUND_FETCH_TIMEOUT
        );
        assert!(policy.update_cache_timeout.is_zero());
        assert!(!policy.report_exceptions_on_background_fetch);
        assert!(policy.use_cache_first.is_none());
        assert!(policy.update_handler.is_none());
        assert!(policy.exception_handler.is_none());
    }

    #[test]
    fn policy_builder() {
        let policy = Policy::new()
            .with_mode(CacheMode::FetchFirst)
            .with_fetch_timeout(Duration::from_secs(5))
            .with_background_fetch_timeout(Duration::from_secs(10))
            .with_update_cache_timeout(Duration::from_millis(500))
            .with_report_background_exceptions(true)
            .with_use_cache_first(|| true)
            .with_update_handler(|_key, _value| {})
            .with_exception_handler(|_err, _background| {});

        assert_eq!(policy.mode, CacheMode::FetchFirst);
        assert_eq!(policy.fetch_timeout, Duration::from_secs(5));
        assert_eq!(policy.background_fetch_timeout, Duration::from_secs(10));
        assert_eq!(policy.update_cache_timeout, Duration::from_millis(500));
        assert!(policy.report_exceptions_on_background_fetch);
        assert!(policy.use_cache_first.is_some());
        assert!(policy.update_handler.is_some());
        assert!(policy.exception_handler.is_some());
    }

    #[test]
    fn background_refresh_enabled_tracks_window() {
        assert!(!Policy::default().background_refresh_enabled());

        let enabled = Policy::new().with_update_cache_timeout(Duration::from_millis(1));
        assert!(enabled.background_refresh_enabled());
    }

    #[test]
    fn policy_debug_omits_callback_bodies() {
        let policy = Policy::new().with_use_cache_first(|| false);
        let formatted = format!("{policy:?}");

        assert!(formatted.contains("use_cache_first: true"));
        assert!(formatted.contains("update_handler: false"));
    }

    #[test]
    fn policy_clone_shares_callbacks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let policy = Policy::new().with_use_cache_first(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            true
        });

        let cloned = policy.clone();
        (cloned.use_cache_first.as_ref().unwrap())();
        (policy.use_cache_first.as_ref().unwrap())();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
