use std::time::Duration;

/// Maximum age at which cached data is served without scheduling any refresh.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(30);

/// Upper bound for one fetcher call. A timed-out fetcher is treated like a
/// failed one and contributes nothing to the aggregation.
pub const FETCHER_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for holdings list calls.
pub const HOLDINGS_PAGE_SIZE: u32 = 100;

/// Maximum number of cache entries kept before LRU eviction.
pub const CACHE_MAX_ENTRIES: usize = 32;
