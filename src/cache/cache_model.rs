use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};

use crate::assets::{AssetRecord, CacheKey};

/// Shared handle to one aggregation result.
pub(crate) type SharedRecords = Arc<Vec<AssetRecord>>;

/// The single-flight future: late-arriving callers for the same key join it
/// instead of starting a second aggregation.
pub(crate) type InFlight = Shared<BoxFuture<'static, SharedRecords>>;

/// Cached aggregation state for one key.
///
/// Mutated only by the cache service, never by consumers. The entry
/// exclusively owns its in-flight future; at most one aggregation per key
/// runs at a time.
#[derive(Default)]
pub(crate) struct CacheEntry {
    pub records: Option<SharedRecords>,
    /// When the last successful aggregation completed.
    pub fetched_at: Option<DateTime<Utc>>,
    /// When the last aggregation was started, successful or not.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Set by invalidation, cleared by a successful refresh. Independent of
    /// the freshness window.
    pub stale: bool,
    pub in_flight: Option<InFlight>,
    /// LRU clock tick of the most recent access.
    pub last_used: u64,
}

impl CacheEntry {
    /// Entry recovered from the durable store. Stale by construction: warm
    /// data is shown instantly but never trusted without a refresh.
    pub fn seeded(persisted: PersistedEntry) -> Self {
        Self {
            records: Some(Arc::new(persisted.records)),
            fetched_at: Some(persisted.fetched_at),
            last_attempt_at: Some(persisted.fetched_at),
            stale: true,
            in_flight: None,
            last_used: 0,
        }
    }
}

/// Point-in-time public view of a cache entry.
///
/// Carries the metadata consumers need to tell "confirmed zero holdings"
/// apart from "could not confirm holdings": an empty list with a recent
/// `fetched_at` and no staleness was confirmed by the backend.
#[derive(Clone, Debug)]
pub struct CacheSnapshot {
    pub records: Arc<Vec<AssetRecord>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub stale: bool,
}

/// Durable form of one cache entry for warm-start persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
    pub key: CacheKey,
    pub records: Vec<AssetRecord>,
    pub fetched_at: DateTime<Utc>,
}
