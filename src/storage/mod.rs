//! Pluggable storage backends for the cache.
//!
//! The orchestrator consults a fast primary backend first and an
//! optional slower/durable secondary backend on a miss. Both sit behind
//! the [`Storage`] trait; the reference implementation is the unbounded
//! [`MemoryStorage`].

mod memory;
mod traits;

pub use memory::MemoryStorage;
pub use traits::{NoOpStorage, Storage};
