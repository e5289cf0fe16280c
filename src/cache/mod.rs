//! Asset cache - keyed store of aggregation results.
//!
//! Provides single-flight request coalescing, independent freshness and
//! staleness axes, LRU capacity eviction, and best-effort warm-start
//! persistence.

mod cache_model;
mod cache_service;
mod cache_store;


pub use cache_model::{CacheSnapshot, PersistedEntry};
pub use cache_service::{AggregateFuture, AssetCache, CacheConfig};
pub use cache_store::{CacheStore, FileCacheStore, NoopCacheStore};
