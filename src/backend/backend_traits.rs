use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::backend_model::RawHolding;
use crate::assets::{AssetClass, ChainId};
use crate::errors::FetchError;

/// The wallet backend API consumed by the asset fetchers.
///
/// Implementations live in the hosting process (HTTP client, native bridge).
/// Prices are denominated per whole token: in the quote currency for
/// quote-priced classes, in the chain's base unit for base-unit-priced ones.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Lists one page of holdings of `class` for `address`. The last page is
    /// the first one shorter than `page_size`.
    async fn list_holdings(
        &self,
        class: AssetClass,
        address: &str,
        chain: ChainId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RawHolding>, FetchError>;

    /// Batched price lookup for exactly the given identifiers. Callers must
    /// never pass an empty set.
    async fn get_prices(
        &self,
        class: AssetClass,
        ids: &[String],
    ) -> Result<HashMap<String, Decimal>, FetchError>;

    /// Confirmed native-coin balance in base units.
    async fn get_native_balance(&self, address: &str, chain: ChainId)
        -> Result<u64, FetchError>;
}
