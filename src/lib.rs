//! Wallet Assets - multi-asset aggregation and caching core.
//!
//! This crate implements the data layer behind the wallet UI's balance and
//! asset views: per-class fetchers fan out concurrently against the wallet
//! backend, an aggregator merges and sorts their records, a keyed cache
//! provides single-flight request coalescing with stale-while-revalidate
//! semantics, and a single session coordinator publishes reactive state to
//! all UI consumers.
//!
//! The crate is backend-agnostic: the wallet backend and the durable
//! warm-start store are traits implemented by the hosting process.

pub mod aggregator;
pub mod assets;
pub mod backend;
pub mod cache;
pub mod constants;
pub mod errors;
pub mod events;
pub mod fetchers;
pub mod session;

// Re-export the domain model and the main service types
pub use aggregator::{AssetAggregator, AssetAggregatorTrait};
pub use assets::{
    format_base_units, format_quote_value, parse_base_units, AssetClass, AssetRecord, CacheKey,
    ChainId, EnabledClasses,
};
pub use cache::{
    AggregateFuture, AssetCache, CacheConfig, CacheSnapshot, CacheStore, FileCacheStore,
    NoopCacheStore, PersistedEntry,
};
pub use events::WalletEvent;
pub use fetchers::{AssetFetcher, NativeFetcher, TokenFetcher};
pub use session::{AssetSession, SessionPhase, SessionState};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
