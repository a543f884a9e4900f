//! Freshcache - policy-driven read-through/refresh-ahead caching.
//!
//! Callers ask for a value by key and a production function; the cache
//! returns a cached value immediately when available, optionally
//! validates it synchronously according to a per-call [`Policy`], and
//! schedules a debounced background refresh so subsequent callers see
//! fresher data without paying fetch latency.
//!
//! The cache sits between an application and an expensive producer (a
//! network call, a computation), and between a fast primary store and an
//! optional slower/durable secondary store, both pluggable behind the
//! [`Storage`] trait.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use freshcache::{producer, Cache, CacheMode, Policy, ProducerError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), freshcache::CacheError> {
//! let cache = Cache::new();
//!
//! cache.events().on_updated(|key, _value| {
//!     println!("cache updated: {key}");
//! });
//!
//! let fetch = producer(|| async {
//!     Ok::<_, ProducerError>(vec![1u8, 2, 3])
//! });
//!
//! let policy = Policy::new()
//!     .with_mode(CacheMode::CacheFirst)
//!     .with_fetch_timeout(Duration::from_secs(5))
//!     .with_update_cache_timeout(Duration::from_secs(60));
//!
//! // First call misses and awaits the producer; later calls return the
//! // cached bytes immediately and refresh in the background.
//! let bytes = cache.run("blob", fetch, Some(policy), None).await?;
//! assert_eq!(bytes, vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod events;
pub mod fetch;
pub mod policy;
pub mod storage;
pub mod tracker;
pub mod types;

pub use cache::{BackgroundUpdate, Cache};
pub use events::CacheEvents;
pub use policy::{CacheMode, Policy};
pub use storage::{MemoryStorage, NoOpStorage, Storage};
pub use tracker::FetchTracker;
pub use types::{
    cache_value, downcast_value, producer, CacheError, CacheValue, Producer, ProducerError,
    StorageValue,
};

/// Version of the freshcache library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
