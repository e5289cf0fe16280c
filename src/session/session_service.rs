use std::sync::{Arc, Mutex};

use futures::FutureExt;
use log::debug;
use rust_decimal::Decimal;
use tokio::sync::watch;

use super::session_model::{SessionPhase, SessionState};
use crate::aggregator::AssetAggregatorTrait;
use crate::assets::{format_quote_value, AssetClass, AssetRecord, CacheKey, DISPLAY_VALUE_UNKNOWN};
use crate::cache::{AggregateFuture, AssetCache};
use crate::events::WalletEvent;

/// The single coordinator every UI surface subscribes to.
///
/// Exactly one instance exists per running UI process, constructed at
/// startup with its cache and aggregator injected; consumers subscribe to it
/// instead of running their own aggregations, which is what makes the
/// cache's single-flight property observable at the UI layer.
pub struct AssetSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    cache: AssetCache,
    aggregator: Arc<dyn AssetAggregatorTrait>,
    state_tx: watch::Sender<SessionState>,
    current: Mutex<Current>,
}

/// The active key plus an epoch counter. Every key change bumps the epoch;
/// a task finishing under an older epoch discards its result instead of
/// applying it to the new key's state.
#[derive(Default)]
struct Current {
    key: Option<CacheKey>,
    epoch: u64,
}

impl AssetSession {
    pub fn new(cache: AssetCache, aggregator: Arc<dyn AssetAggregatorTrait>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::idle());
        Self {
            inner: Arc::new(SessionInner {
                cache,
                aggregator,
                state_tx,
                current: Mutex::new(Current::default()),
            }),
        }
    }

    /// Subscribes to the reactive session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Current state snapshot, for consumers that poll rather than watch.
    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Switches the session to a new cache key (account, chain, or
    /// enabled-class change).
    ///
    /// A warm cache hit is published synchronously - no loading flash - and
    /// a background refresh is scheduled when the entry is stale or aged.
    /// A cold key publishes `LoadingInitial` and resolves asynchronously.
    pub fn set_key(&self, key: CacheKey) {
        let epoch = {
            let mut current = self.inner.current.lock().unwrap();
            if current.key.as_ref() == Some(&key) {
                return;
            }
            current.key = Some(key.clone());
            current.epoch += 1;
            current.epoch
        };

        match self.inner.cache.snapshot(&key) {
            Some(snapshot) => {
                self.inner.publish(
                    epoch,
                    SessionState {
                        key: Some(key.clone()),
                        assets: snapshot.records,
                        phase: SessionPhase::Ready,
                        fetched_at: snapshot.fetched_at,
                        last_attempt_at: snapshot.last_attempt_at,
                        stale: snapshot.stale,
                    },
                );
                if self.inner.cache.needs_refresh(&key) {
                    self.inner.clone().spawn_background_refresh(key, epoch);
                }
            }
            None => {
                self.inner.publish(
                    epoch,
                    SessionState {
                        key: Some(key.clone()),
                        assets: Arc::new(Vec::new()),
                        phase: SessionPhase::LoadingInitial,
                        fetched_at: None,
                        last_attempt_at: None,
                        stale: false,
                    },
                );
                self.inner.clone().spawn_initial_load(key, epoch);
            }
        }
    }

    /// Consumer-requested refresh of the current key.
    pub fn refresh(&self) {
        let (key, epoch) = {
            let current = self.inner.current.lock().unwrap();
            match current.key.clone() {
                Some(key) => (key, current.epoch),
                None => return,
            }
        };
        self.inner.clone().spawn_background_refresh(key, epoch);
    }

    /// In-place repricing of the native record from an out-of-band quote
    /// push. Recomputes that one record's display value and re-sorts; no
    /// aggregation, no cache round trip.
    pub fn apply_native_quote(&self, price: Decimal) {
        self.inner.state_tx.send_modify(|state| {
            let Some(index) = state
                .assets
                .iter()
                .position(|record| record.asset_class == AssetClass::Native)
            else {
                return;
            };
            let mut assets: Vec<AssetRecord> = (*state.assets).clone();
            let native = &mut assets[index];
            native.display_value = native
                .amount
                .checked_mul(price)
                .map(format_quote_value)
                .unwrap_or_else(|| DISPLAY_VALUE_UNKNOWN.to_string());
            // The native sort key stays in base units; the stable re-sort
            // keeps the ordering invariant for every published state.
            assets.sort_by(|a, b| a.value.cmp(&b.value));
            state.assets = Arc::new(assets);
        });
    }

    /// Routes a wallet signal to the matching cache or session action.
    pub fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::BalanceChanged { address } => {
                self.inner.cache.invalidate_address(&address);
                let affected = {
                    let current = self.inner.current.lock().unwrap();
                    match &current.key {
                        Some(key) if key.address == address => {
                            Some((key.clone(), current.epoch))
                        }
                        _ => None,
                    }
                };
                if let Some((key, epoch)) = affected {
                    self.inner.clone().spawn_background_refresh(key, epoch);
                }
            }
            WalletEvent::AccountRemoved { address } => {
                self.inner.cache.evict_address(&address);
                let mut current = self.inner.current.lock().unwrap();
                if current
                    .key
                    .as_ref()
                    .is_some_and(|key| key.address == address)
                {
                    current.key = None;
                    current.epoch += 1;
                    self.inner.state_tx.send_replace(SessionState::idle());
                }
            }
            WalletEvent::NativeQuoteChanged { price } => self.apply_native_quote(price),
        }
    }
}

impl SessionInner {
    fn aggregate_future(
        aggregator: Arc<dyn AssetAggregatorTrait>,
        key: CacheKey,
    ) -> AggregateFuture {
        async move {
            aggregator
                .aggregate(&key.address, key.chain, &key.enabled)
                .await
        }
        .boxed()
    }

    /// Blocking load for a key with no cached data.
    fn spawn_initial_load(self: Arc<Self>, key: CacheKey, epoch: u64) {
        tokio::spawn(async move {
            let aggregator = self.aggregator.clone();
            let aggregate_key = key.clone();
            let records = self
                .cache
                .get(&key, move || {
                    Self::aggregate_future(aggregator, aggregate_key)
                })
                .await;
            self.finish(epoch, &key, records);
        });
    }

    /// Solicited refresh: always re-aggregates (joining any running flight)
    /// while consumers keep the last-known list.
    fn spawn_background_refresh(self: Arc<Self>, key: CacheKey, epoch: u64) {
        self.transition(epoch, SessionPhase::BackgroundRefreshing);
        tokio::spawn(async move {
            let aggregator = self.aggregator.clone();
            let aggregate_key = key.clone();
            let records = self
                .cache
                .force_refresh(&key, move || {
                    Self::aggregate_future(aggregator, aggregate_key)
                })
                .await;
            self.finish(epoch, &key, records);
        });
    }

    fn publish(&self, epoch: u64, state: SessionState) {
        let current = self.current.lock().unwrap();
        if current.epoch != epoch {
            return;
        }
        self.state_tx.send_replace(state);
    }

    fn transition(&self, epoch: u64, phase: SessionPhase) {
        let current = self.current.lock().unwrap();
        if current.epoch != epoch {
            return;
        }
        self.state_tx.send_modify(|state| state.phase = phase);
    }

    /// Publishes a finished aggregation, unless the key was superseded while
    /// it ran - a late result for an old key is discarded, never applied.
    fn finish(&self, epoch: u64, key: &CacheKey, records: Arc<Vec<AssetRecord>>) {
        let current = self.current.lock().unwrap();
        if current.epoch != epoch {
            debug!("discarding late asset result for superseded key {key}");
            return;
        }
        let snapshot = self.cache.snapshot(key);
        self.state_tx.send_replace(SessionState {
            key: Some(key.clone()),
            assets: records,
            phase: SessionPhase::Ready,
            fetched_at: snapshot.as_ref().and_then(|s| s.fetched_at),
            last_attempt_at: snapshot.as_ref().and_then(|s| s.last_attempt_at),
            stale: snapshot.as_ref().map(|s| s.stale).unwrap_or(false),
        });
    }
}
