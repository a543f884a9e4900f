//! Core value, producer, and error types for the cache.

use std::any::Any;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// Boxed error returned by caller-supplied producer functions.
pub type ProducerError = Box<dyn StdError + Send + Sync>;

/// Caller-supplied asynchronous production function.
///
/// A producer may be invoked zero, one, or two times per `run` call
/// (foreground and background), and concurrently with itself across
/// different `run` calls for the same key, so it is shared behind an
/// `Arc` rather than consumed.
pub type Producer<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, ProducerError>> + Send + Sync>;

/// Wrap an async closure as a [`Producer`].
///
/// # Example
///
/// ```
/// use freshcache::producer;
///
/// let fetch = producer(|| async { Ok::<_, freshcache::ProducerError>(42u32) });
/// ```
pub fn producer<T, F, Fut>(f: F) -> Producer<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ProducerError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A write was attempted with an empty key.
    #[error("invalid cache key: key must not be empty")]
    InvalidKey,

    /// A producer did not complete within its allotted duration.
    ///
    /// The producer invocation is abandoned, not interrupted: it may
    /// still run to completion with side effects nobody observes.
    #[error("producer timed out after {0:?}")]
    Timeout(Duration),

    /// A producer failed with its own error.
    #[error("producer failed: {0}")]
    Producer(#[source] ProducerError),
}

impl CacheError {
    /// Whether this error is a producer deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CacheError::Timeout(_))
    }
}

/// Opaque stored value, typed at read time.
pub type CacheValue = Arc<dyn StorageValue>;

/// Object-safe wrapper around stored values.
///
/// Storage backends hold values as trait objects; reads downcast back to
/// the concrete type via [`as_any`](StorageValue::as_any). Equality
/// between trait objects drives the changed-on-store signal.
pub trait StorageValue: Any + Send + Sync {
    /// Reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compare against another stored value.
    ///
    /// Values of different concrete types are never equal.
    fn eq_value(&self, other: &dyn StorageValue) -> bool;
}

impl<T> StorageValue for T
where
    T: Any + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn StorageValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| other == self)
    }
}

/// Wrap a concrete value as an opaque [`CacheValue`].
pub fn cache_value<T>(value: T) -> CacheValue
where
    T: Any + PartialEq + Send + Sync,
{
    Arc::new(value)
}

/// Downcast an opaque stored value to a concrete type, cloning it out.
///
/// Returns `None` when the stored value has a different concrete type.
pub fn downcast_value<T>(value: &CacheValue) -> Option<T>
where
    T: Any + Clone,
{
    value.as_any().downcast_ref::<T>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            CacheError::InvalidKey.to_string(),
            "invalid cache key: key must not be empty"
        );

        let timeout = CacheError::Timeout(Duration::from_millis(250));
        assert!(timeout.to_string().contains("250ms"));
        assert!(timeout.is_timeout());
        assert!(!CacheError::InvalidKey.is_timeout());
    }

    #[test]
    fn producer_error_is_preserved_as_source() {
        let inner: ProducerError = "backend unavailable".into();
        let err = CacheError::Producer(inner);

        assert!(err.to_string().contains("backend unavailable"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn values_of_same_type_compare_by_contents() {
        let a = cache_value(42u32);
        let b = cache_value(42u32);
        let c = cache_value(43u32);

        assert!(a.eq_value(b.as_ref()));
        assert!(!a.eq_value(c.as_ref()));
    }

    #[test]
    fn values_of_different_types_never_compare_equal() {
        let number = cache_value(1u32);
        let text = cache_value("1".to_string());

        assert!(!number.eq_value(text.as_ref()));
        assert!(!text.eq_value(number.as_ref()));
    }

    #[test]
    fn downcast_to_expected_type() {
        let value = cache_value("hello".to_string());

        assert_eq!(downcast_value::<String>(&value), Some("hello".to_string()));
        assert_eq!(downcast_value::<u32>(&value), None);
    }

    #[tokio::test]
    async fn producer_helper_is_repeatedly_invokable() {
        let fetch = producer(|| async { Ok::<_, ProducerError>(7u32) });

        assert_eq!((fetch)().await.unwrap(), 7);
        assert_eq!((fetch)().await.unwrap(), 7);
    }
}
