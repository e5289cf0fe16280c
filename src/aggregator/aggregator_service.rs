use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};
use tokio::time::timeout;

use crate::assets::{AssetClass, AssetRecord, ChainId, EnabledClasses};
use crate::backend::WalletBackend;
use crate::constants::FETCHER_TIMEOUT;
use crate::errors::FetchError;
use crate::fetchers::{AssetFetcher, NativeFetcher, TokenFetcher};

/// Runs every enabled fetcher concurrently and merges the results into one
/// ordered view.
#[async_trait]
pub trait AssetAggregatorTrait: Send + Sync {
    /// Never fails: a class whose fetcher errors or times out contributes an
    /// empty list, and a total failure yields an empty result. Callers
    /// distinguish "empty" from "unknown" through the cache's metadata, not
    /// through errors here.
    async fn aggregate(
        &self,
        address: &str,
        chain: ChainId,
        enabled: &EnabledClasses,
    ) -> Vec<AssetRecord>;
}

pub struct AssetAggregator {
    fetchers: Vec<Arc<dyn AssetFetcher>>,
    fetcher_timeout: Duration,
}

impl AssetAggregator {
    /// Builds the standard fetcher set - the native coin plus every optional
    /// class - on top of one backend.
    pub fn new(backend: Arc<dyn WalletBackend>) -> Self {
        let mut fetchers: Vec<Arc<dyn AssetFetcher>> =
            vec![Arc::new(NativeFetcher::new(backend.clone()))];
        for class in AssetClass::OPTIONAL {
            fetchers.push(Arc::new(TokenFetcher::new(backend.clone(), class)));
        }
        Self::with_fetchers(fetchers)
    }

    pub fn with_fetchers(fetchers: Vec<Arc<dyn AssetFetcher>>) -> Self {
        Self {
            fetchers,
            fetcher_timeout: FETCHER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, fetcher_timeout: Duration) -> Self {
        self.fetcher_timeout = fetcher_timeout;
        self
    }
}

#[async_trait]
impl AssetAggregatorTrait for AssetAggregator {
    async fn aggregate(
        &self,
        address: &str,
        chain: ChainId,
        enabled: &EnabledClasses,
    ) -> Vec<AssetRecord> {
        // The native fetcher always runs; optional classes only when enabled.
        let launched: Vec<&Arc<dyn AssetFetcher>> = self
            .fetchers
            .iter()
            .filter(|fetcher| fetcher.class().is_native() || enabled.contains(fetcher.class()))
            .collect();
        debug!(
            "aggregating {} asset classes for {address} on {chain}",
            launched.len()
        );

        let fetches = launched.into_iter().map(|fetcher| async move {
            let result = match timeout(self.fetcher_timeout, fetcher.fetch(address, chain)).await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };
            match result {
                Ok(records) => records,
                Err(e) => {
                    // Partial failure: this class contributes nothing, the
                    // rest of the aggregation proceeds.
                    warn!("{} fetch failed for {address}: {e}", fetcher.class());
                    Vec::new()
                }
            }
        });

        // Concatenation keeps launch order, and the sort is stable, so ties
        // on `value` preserve the original fetch order.
        let mut merged: Vec<AssetRecord> = join_all(fetches).await.into_iter().flatten().collect();
        merged.sort_by(|a, b| a.value.cmp(&b.value));
        merged
    }
}
