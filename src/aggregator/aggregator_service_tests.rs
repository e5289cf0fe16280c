use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::sleep;

use super::*;
use crate::assets::{AssetClass, AssetRecord, ChainId, EnabledClasses, DISPLAY_VALUE_UNKNOWN};
use crate::errors::FetchError;

const ADDRESS: &str = "bc1qalice";

fn record(class: AssetClass, id: &str, value: Decimal) -> AssetRecord {
    AssetRecord {
        id: id.to_string(),
        asset_class: class,
        display_name: id.to_string(),
        symbol: id.to_uppercase(),
        amount: dec!(1),
        value,
        display_value: DISPLAY_VALUE_UNKNOWN.to_string(),
    }
}

struct StubFetcher {
    class: AssetClass,
    records: Vec<AssetRecord>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicU32>,
}

impl StubFetcher {
    fn returning(class: AssetClass, records: Vec<AssetRecord>) -> Self {
        Self {
            class,
            records,
            fail: false,
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn failing(class: AssetClass) -> Self {
        Self {
            fail: true,
            ..Self::returning(class, Vec::new())
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl crate::fetchers::AssetFetcher for StubFetcher {
    fn class(&self) -> AssetClass {
        self.class
    }

    async fn fetch(
        &self,
        _address: &str,
        _chain: ChainId,
    ) -> Result<Vec<AssetRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail {
            return Err(FetchError::Backend("scripted failure".to_string()));
        }
        Ok(self.records.clone())
    }
}

#[tokio::test]
async fn test_merge_sorts_ascending_by_value() {
    let a = StubFetcher::returning(
        AssetClass::Brc20,
        vec![
            record(AssetClass::Brc20, "a5", dec!(5)),
            record(AssetClass::Brc20, "a1", dec!(1)),
        ],
    );
    let b = StubFetcher::returning(AssetClass::Arc20, vec![record(AssetClass::Arc20, "b3", dec!(3))]);

    let aggregator = AssetAggregator::with_fetchers(vec![Arc::new(a), Arc::new(b)]);
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;

    let values: Vec<Decimal> = merged.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![dec!(1), dec!(3), dec!(5)]);
}

#[tokio::test]
async fn test_ties_keep_launch_order() {
    let first = StubFetcher::returning(
        AssetClass::Brc20,
        vec![record(AssetClass::Brc20, "first", dec!(7))],
    );
    let second = StubFetcher::returning(
        AssetClass::Arc20,
        vec![record(AssetClass::Arc20, "second", dec!(7))],
    );

    let aggregator = AssetAggregator::with_fetchers(vec![Arc::new(first), Arc::new(second)]);
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;

    assert_eq!(merged[0].id, "first");
    assert_eq!(merged[1].id, "second");
}

#[tokio::test]
async fn test_partial_failure_keeps_other_classes() {
    let good = StubFetcher::returning(
        AssetClass::Brc20,
        vec![
            record(AssetClass::Brc20, "a", dec!(2)),
            record(AssetClass::Brc20, "b", dec!(1)),
        ],
    );
    let bad = StubFetcher::failing(AssetClass::Arc20);

    let aggregator = AssetAggregator::with_fetchers(vec![Arc::new(good), Arc::new(bad)]);
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;

    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|r| r.asset_class == AssetClass::Brc20));
    assert_eq!(merged[0].value, dec!(1));
}

#[tokio::test]
async fn test_total_failure_yields_empty_list() {
    let aggregator = AssetAggregator::with_fetchers(vec![
        Arc::new(StubFetcher::failing(AssetClass::Native)),
        Arc::new(StubFetcher::failing(AssetClass::Brc20)),
    ]);
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;
    assert!(merged.is_empty());
}

#[tokio::test]
async fn test_disabled_classes_are_not_fetched() {
    let native = StubFetcher::returning(
        AssetClass::Native,
        vec![record(AssetClass::Native, "native", dec!(10))],
    );
    let rune = StubFetcher::returning(
        AssetClass::Rune,
        vec![record(AssetClass::Rune, "840000:3", dec!(4))],
    );
    let rune_calls = rune.calls.clone();

    let aggregator = AssetAggregator::with_fetchers(vec![Arc::new(native), Arc::new(rune)]);
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::none())
        .await;

    // Native is launched unconditionally; the disabled rune fetcher never runs.
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].asset_class, AssetClass::Native);
    assert_eq!(rune_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timed_out_fetcher_contributes_nothing() {
    let slow = StubFetcher::returning(
        AssetClass::Brc20,
        vec![record(AssetClass::Brc20, "slow", dec!(1))],
    )
    .delayed(Duration::from_millis(500));
    let fast = StubFetcher::returning(
        AssetClass::Arc20,
        vec![record(AssetClass::Arc20, "fast", dec!(2))],
    );

    let aggregator = AssetAggregator::with_fetchers(vec![Arc::new(slow), Arc::new(fast)])
        .with_timeout(Duration::from_millis(50));
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, "fast");
}

#[tokio::test]
async fn test_fetchers_run_concurrently() {
    // Three fetchers, each sleeping 100ms: concurrent execution finishes in
    // roughly one delay, sequential would take three.
    let fetchers: Vec<Arc<dyn crate::fetchers::AssetFetcher>> =
        [AssetClass::Brc20, AssetClass::Arc20, AssetClass::Stable]
            .into_iter()
            .map(|class| {
                Arc::new(
                    StubFetcher::returning(class, vec![record(class, class.as_str(), dec!(1))])
                        .delayed(Duration::from_millis(100)),
                ) as Arc<dyn crate::fetchers::AssetFetcher>
            })
            .collect();

    let aggregator = AssetAggregator::with_fetchers(fetchers);
    let started = std::time::Instant::now();
    let merged = aggregator
        .aggregate(ADDRESS, ChainId::Mainnet, &EnabledClasses::all())
        .await;

    assert_eq!(merged.len(), 3);
    assert!(
        started.elapsed() < Duration::from_millis(250),
        "fetchers ran sequentially: {:?}",
        started.elapsed()
    );
}
