use async_trait::async_trait;

use crate::assets::{AssetClass, AssetRecord, ChainId};
use crate::errors::FetchError;

/// Fetches and normalizes all holdings of one asset class for one address.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// The asset class this fetcher is responsible for.
    fn class(&self) -> AssetClass;

    /// Produces the normalized records for `(address, chain)`.
    ///
    /// Must be idempotent and free of side effects on shared state: calling
    /// it twice with the same inputs only affects its return value.
    async fn fetch(&self, address: &str, chain: ChainId) -> Result<Vec<AssetRecord>, FetchError>;
}
