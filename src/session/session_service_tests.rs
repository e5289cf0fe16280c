use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use super::*;
use crate::aggregator::AssetAggregatorTrait;
use crate::assets::{
    AssetClass, AssetRecord, CacheKey, ChainId, EnabledClasses, NATIVE_ASSET_ID,
};
use crate::cache::{AssetCache, NoopCacheStore};
use crate::events::WalletEvent;

fn key(address: &str) -> CacheKey {
    CacheKey::new(address, ChainId::Mainnet, EnabledClasses::all())
}

fn record(class: AssetClass, id: &str, value: Decimal) -> AssetRecord {
    AssetRecord {
        id: id.to_string(),
        asset_class: class,
        display_name: id.to_string(),
        symbol: id.to_uppercase(),
        amount: dec!(1),
        value,
        display_value: "1.00".to_string(),
    }
}

/// Aggregator double scripted per address, with optional per-address delays.
#[derive(Clone, Default)]
struct ScriptedAggregator {
    results: Arc<Mutex<HashMap<String, Vec<AssetRecord>>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    calls: Arc<AtomicU32>,
}

impl ScriptedAggregator {
    fn set_result(&self, address: &str, records: Vec<AssetRecord>) {
        self.results
            .lock()
            .unwrap()
            .insert(address.to_string(), records);
    }

    fn set_delay(&self, address: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(address.to_string(), delay);
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetAggregatorTrait for ScriptedAggregator {
    async fn aggregate(
        &self,
        address: &str,
        _chain: ChainId,
        _enabled: &EnabledClasses,
    ) -> Vec<AssetRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(address).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.results
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}

fn session_with(aggregator: &ScriptedAggregator) -> (AssetSession, AssetCache) {
    let cache = AssetCache::new(Arc::new(NoopCacheStore));
    let session = AssetSession::new(cache.clone(), Arc::new(aggregator.clone()));
    (session, cache)
}

/// Waits until the published state satisfies `predicate`.
async fn wait_for(
    rx: &mut watch::Receiver<SessionState>,
    predicate: impl Fn(&SessionState) -> bool,
) -> SessionState {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow().clone();
                if predicate(&state) {
                    return state;
                }
            }
            rx.changed().await.expect("session dropped");
        }
    })
    .await
    .expect("state never matched")
}

#[tokio::test]
async fn test_cold_key_goes_loading_then_ready() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    aggregator.set_delay("bc1qalice", Duration::from_millis(30));
    let (session, _cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));

    let loading = session.state();
    assert!(loading.is_loading_initial());
    assert!(loading.assets.is_empty());

    let ready = wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;
    assert_eq!(ready.assets.len(), 1);
    assert!(!ready.is_loading_initial());
    assert!(ready.fetched_at.is_some());
}

#[tokio::test]
async fn test_warm_key_publishes_cached_without_loading_flash() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, cache) = session_with(&aggregator);

    // Warm the cache through a first session lifetime.
    let mut rx = session.subscribe();
    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;

    // Simulate an external balance signal, then revisit the key.
    cache.invalidate(&key("bc1qalice"));
    aggregator.set_delay("bc1qalice", Duration::from_millis(50));
    session.set_key(key("bc1qbob"));
    session.set_key(key("bc1qalice"));

    // The cached list is visible synchronously; no loading flash.
    let state = session.state();
    assert!(!state.is_loading_initial());
    assert_eq!(state.assets.len(), 1);

    // And the stale entry is refreshed behind it.
    let refreshed = wait_for(&mut rx, |s| {
        s.phase == SessionPhase::Ready && !s.stale && s.key == Some(key("bc1qalice"))
    })
    .await;
    assert_eq!(refreshed.assets.len(), 1);
}

#[tokio::test]
async fn test_key_churn_discards_late_result() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qslow",
        vec![record(AssetClass::Native, "slow-native", dec!(1))],
    );
    aggregator.set_delay("bc1qslow", Duration::from_millis(150));
    aggregator.set_result(
        "bc1qfast",
        vec![record(AssetClass::Native, "fast-native", dec!(2))],
    );
    let (session, _cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    // Switch away before the first key's aggregation resolves.
    session.set_key(key("bc1qslow"));
    session.set_key(key("bc1qfast"));

    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;
    // Give the slow aggregation time to resolve after the switch.
    sleep(Duration::from_millis(250)).await;

    let state = session.state();
    assert_eq!(state.key, Some(key("bc1qfast")));
    assert_eq!(state.assets[0].id, "fast-native", "late K1 result discarded");
}

#[tokio::test]
async fn test_refresh_action_forces_new_aggregation() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, _cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;
    assert_eq!(aggregator.call_count(), 1);

    // Entry is fresh, but a consumer-requested refresh supersedes the window.
    aggregator.set_result(
        "bc1qalice",
        vec![
            record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100)),
            record(AssetClass::Brc20, "ordi", dec!(5)),
        ],
    );
    session.refresh();

    let refreshed = wait_for(&mut rx, |s| s.assets.len() == 2).await;
    assert_eq!(aggregator.call_count(), 2);
    assert_eq!(refreshed.phase, SessionPhase::Ready);
}

#[tokio::test]
async fn test_apply_native_quote_reprices_in_place() {
    let aggregator = ScriptedAggregator::default();
    let mut native = record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100000000));
    native.amount = dec!(1.00000000);
    native.display_value = "30000.00".to_string();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Brc20, "ordi", dec!(5)), native],
    );
    let (session, _cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;

    session.apply_native_quote(dec!(60000));

    let state = session.state();
    let native = state
        .assets
        .iter()
        .find(|r| r.asset_class == AssetClass::Native)
        .unwrap();
    assert_eq!(native.display_value, "60000.00");
    // No aggregation ran for the repricing.
    assert_eq!(aggregator.call_count(), 1);
    // The non-native record is untouched.
    let ordi = state.assets.iter().find(|r| r.id == "ordi").unwrap();
    assert_eq!(ordi.display_value, "1.00");
    // Ordering by value still holds.
    assert_eq!(state.assets[0].id, "ordi");
}

#[tokio::test]
async fn test_balance_changed_event_refreshes_current_key() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;

    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(200))],
    );
    session.handle_event(WalletEvent::balance_changed("bc1qalice"));

    let refreshed = wait_for(&mut rx, |s| s.assets[0].value == dec!(200)).await;
    assert_eq!(refreshed.phase, SessionPhase::Ready);
    assert!(!cache.needs_refresh(&key("bc1qalice")));
}

#[tokio::test]
async fn test_balance_changed_for_other_address_only_invalidates() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;
    assert_eq!(aggregator.call_count(), 1);

    session.handle_event(WalletEvent::balance_changed("bc1qother"));
    sleep(Duration::from_millis(30)).await;

    // Not the active key: no refresh is spawned.
    assert_eq!(aggregator.call_count(), 1);
    assert!(!cache.needs_refresh(&key("bc1qalice")));
}

#[tokio::test]
async fn test_account_removed_event_evicts_and_resets() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;

    session.handle_event(WalletEvent::account_removed("bc1qalice"));

    let state = session.state();
    assert_eq!(state.phase, SessionPhase::Idle);
    assert!(state.assets.is_empty());
    assert!(cache.peek(&key("bc1qalice")).is_none());
}

#[tokio::test]
async fn test_set_key_is_idempotent_for_same_key() {
    let aggregator = ScriptedAggregator::default();
    aggregator.set_result(
        "bc1qalice",
        vec![record(AssetClass::Native, NATIVE_ASSET_ID, dec!(100))],
    );
    let (session, _cache) = session_with(&aggregator);
    let mut rx = session.subscribe();

    session.set_key(key("bc1qalice"));
    wait_for(&mut rx, |s| s.phase == SessionPhase::Ready).await;
    session.set_key(key("bc1qalice"));

    // Same key: no epoch bump, no new load.
    assert_eq!(aggregator.call_count(), 1);
    assert_eq!(session.state().phase, SessionPhase::Ready);
}
