use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};

use super::cache_model::{CacheEntry, CacheSnapshot, InFlight, PersistedEntry, SharedRecords};
use super::cache_store::CacheStore;
use crate::assets::{AssetRecord, CacheKey};
use crate::constants::{CACHE_MAX_ENTRIES, FRESHNESS_WINDOW};

/// Future produced by the caller-supplied aggregation closure.
pub type AggregateFuture = BoxFuture<'static, Vec<AssetRecord>>;

/// Cache tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Maximum age at which cached data is served without any refresh.
    pub freshness_window: Duration,
    /// Entry count bound; least recently used entries are evicted beyond it.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_window: FRESHNESS_WINDOW,
            max_entries: CACHE_MAX_ENTRIES,
        }
    }
}

/// Keyed store of the aggregator's last result per cache key.
///
/// Cloning is cheap and every clone shares the same entries. The map is
/// mutated exclusively through these methods; the per-key in-flight future
/// is the only serialization point, and no map guard is ever held across a
/// suspension point.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: DashMap<CacheKey, CacheEntry>,
    store: Arc<dyn CacheStore>,
    freshness_window: chrono::Duration,
    max_entries: usize,
    lru_clock: AtomicU64,
}

impl AssetCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let freshness_window =
            chrono::Duration::from_std(config.freshness_window).unwrap_or(chrono::TimeDelta::MAX);
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                store,
                freshness_window,
                max_entries: config.max_entries,
                lru_clock: AtomicU64::new(0),
            }),
        }
    }

    /// Non-blocking read of the current cached list, regardless of
    /// staleness. Used for instant initial render from a previous session.
    pub fn peek(&self, key: &CacheKey) -> Option<SharedRecords> {
        let mut entry = self.inner.entries.get_mut(key)?;
        entry.last_used = self.inner.tick();
        entry.records.clone()
    }

    /// Like [`peek`](Self::peek), but with the freshness metadata consumers
    /// need to interpret an empty list.
    pub fn snapshot(&self, key: &CacheKey) -> Option<CacheSnapshot> {
        let mut entry = self.inner.entries.get_mut(key)?;
        entry.last_used = self.inner.tick();
        let records = entry.records.clone()?;
        Some(CacheSnapshot {
            records,
            fetched_at: entry.fetched_at,
            last_attempt_at: entry.last_attempt_at,
            stale: entry.stale,
        })
    }

    /// True when the next [`get`](Self::get) for this key would trigger or
    /// join an aggregation rather than answer purely from cache.
    pub fn needs_refresh(&self, key: &CacheKey) -> bool {
        match self.inner.entries.get(key) {
            Some(entry) => {
                entry.stale || entry.records.is_none() || !self.inner.is_fresh(entry.fetched_at)
            }
            None => true,
        }
    }

    /// Returns the cached list, aggregating when needed.
    ///
    /// Fresh and not stale: answers immediately. Stale but within the
    /// freshness window: answers immediately with the cached list and
    /// revalidates in the background. No data, or beyond the window: awaits
    /// the (single-flight) aggregation.
    pub async fn get<F>(&self, key: &CacheKey, aggregate: F) -> SharedRecords
    where
        F: FnOnce() -> AggregateFuture + Send,
    {
        let inner = &self.inner;
        let mut entry = inner.entries.entry(key.clone()).or_default();
        entry.last_used = inner.tick();

        if let Some(records) = entry.records.clone() {
            if inner.is_fresh(entry.fetched_at) {
                if !entry.stale {
                    return records;
                }
                // Stale-while-revalidate: the consumer keeps the last-known
                // list, the refresh completes behind it.
                let flight = CacheInner::join_or_start(inner, &mut entry, key, aggregate);
                drop(entry);
                tokio::spawn(flight.map(|_| ()));
                return records;
            }
        }

        let flight = CacheInner::join_or_start(inner, &mut entry, key, aggregate);
        drop(entry);
        self.trim_to_capacity();
        flight.await
    }

    /// Always refreshes: joins the in-flight aggregation if one is running,
    /// starts one otherwise, and returns the fresh result. Supersedes the
    /// freshness window.
    pub async fn force_refresh<F>(&self, key: &CacheKey, aggregate: F) -> SharedRecords
    where
        F: FnOnce() -> AggregateFuture + Send,
    {
        let inner = &self.inner;
        let mut entry = inner.entries.entry(key.clone()).or_default();
        entry.last_used = inner.tick();
        let flight = CacheInner::join_or_start(inner, &mut entry, key, aggregate);
        drop(entry);
        self.trim_to_capacity();
        flight.await
    }

    /// Marks the entry stale without dropping its data: consumers keep the
    /// last-known list until the next successful refresh.
    pub fn invalidate(&self, key: &CacheKey) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.stale = true;
            debug!("invalidated cache entry for {key}");
        }
    }

    /// Marks every cached key for `address` stale, whatever the chain or
    /// enabled-class set: a balance change cannot be attributed to one
    /// fingerprint.
    pub fn invalidate_address(&self, address: &str) {
        for mut entry in self.inner.entries.iter_mut() {
            if entry.key().address == address {
                entry.stale = true;
            }
        }
    }

    /// Removes the entry entirely, in memory and in the durable store.
    pub fn evict(&self, key: &CacheKey) {
        if self.inner.entries.remove(key).is_some() {
            debug!("evicted cache entry for {key}");
        }
        self.inner.remove_persisted(vec![key.clone()]);
    }

    /// Removes every entry for `address`. Used on account removal.
    pub fn evict_address(&self, address: &str) {
        let keys: Vec<CacheKey> = self
            .inner
            .entries
            .iter()
            .filter(|entry| entry.key().address == address)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &keys {
            self.inner.entries.remove(key);
        }
        if !keys.is_empty() {
            debug!("evicted {} cache entries for {address}", keys.len());
            self.inner.remove_persisted(keys);
        }
    }

    /// Seeds the in-memory map from the durable store. Called once at
    /// process start, before any consumer runs; never on the hot path.
    /// Returns the number of seeded entries.
    pub async fn seed_from_store(&self) -> usize {
        match self.inner.store.load_all().await {
            Ok(persisted) => {
                let count = persisted.len();
                for entry in persisted {
                    self.inner
                        .entries
                        .insert(entry.key.clone(), CacheEntry::seeded(entry));
                }
                debug!("seeded {count} cache entries from the durable store");
                count
            }
            Err(e) => {
                warn!("cache warm start failed: {e}");
                0
            }
        }
    }

    fn trim_to_capacity(&self) {
        let inner = &self.inner;
        while inner.entries.len() > inner.max_entries {
            let victim = inner
                .entries
                .iter()
                .filter(|entry| entry.in_flight.is_none())
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    inner.entries.remove(&key);
                    debug!("evicted least recently used cache entry {key}");
                }
                None => break,
            }
        }
    }
}

impl CacheInner {
    fn tick(&self) -> u64 {
        self.lru_clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn is_fresh(&self, fetched_at: Option<DateTime<Utc>>) -> bool {
        match fetched_at {
            Some(at) => Utc::now().signed_duration_since(at) < self.freshness_window,
            None => false,
        }
    }

    /// Joins the entry's in-flight aggregation, or starts one. Called with
    /// the entry guard held; the guard is released before anything awaits.
    fn join_or_start<F>(
        inner: &Arc<CacheInner>,
        entry: &mut CacheEntry,
        key: &CacheKey,
        aggregate: F,
    ) -> InFlight
    where
        F: FnOnce() -> AggregateFuture,
    {
        if let Some(flight) = entry.in_flight.clone() {
            return flight;
        }
        entry.last_attempt_at = Some(Utc::now());
        let future = aggregate();
        let inner = inner.clone();
        let key = key.clone();
        let flight: InFlight = async move {
            let records: SharedRecords = Arc::new(future.await);
            inner.complete(&key, records.clone());
            records
        }
        .boxed()
        .shared();
        entry.in_flight = Some(flight.clone());
        flight
    }

    /// Stores a finished aggregation and schedules the write-behind persist.
    fn complete(&self, key: &CacheKey, records: SharedRecords) {
        let fetched_at = Utc::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.records = Some(records.clone());
            entry.fetched_at = Some(fetched_at);
            entry.stale = false;
            entry.in_flight = None;
        } else {
            // The entry was evicted while its aggregation ran; the late
            // result is discarded.
            debug!("dropping aggregation result for evicted key {key}");
            return;
        }

        let store = self.store.clone();
        let persisted = PersistedEntry {
            key: key.clone(),
            records: (*records).clone(),
            fetched_at,
        };
        tokio::spawn(async move {
            if let Err(e) = store.save(&persisted).await {
                warn!("failed to persist cache entry for {}: {e}", persisted.key);
            }
        });
    }

    fn remove_persisted(&self, keys: Vec<CacheKey>) {
        let store = self.store.clone();
        tokio::spawn(async move {
            for key in keys {
                if let Err(e) = store.remove(&key).await {
                    warn!("failed to remove persisted cache entry for {key}: {e}");
                }
            }
        });
    }
}
