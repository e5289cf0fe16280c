use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;

use super::fetchers_traits::AssetFetcher;
use crate::assets::{
    format_quote_value, native_amount, AssetClass, AssetRecord, ChainId, DISPLAY_VALUE_UNKNOWN,
    NATIVE_ASSET_ID, NATIVE_NAME, NATIVE_SYMBOL,
};
use crate::backend::WalletBackend;
use crate::errors::FetchError;

/// Fetcher for the chain's native coin.
///
/// Always yields exactly one record, even for a zero balance: the wallet
/// shows the native coin row unconditionally.
pub struct NativeFetcher {
    backend: Arc<dyn WalletBackend>,
}

impl NativeFetcher {
    pub fn new(backend: Arc<dyn WalletBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AssetFetcher for NativeFetcher {
    fn class(&self) -> AssetClass {
        AssetClass::Native
    }

    async fn fetch(&self, address: &str, chain: ChainId) -> Result<Vec<AssetRecord>, FetchError> {
        let base_units = self.backend.get_native_balance(address, chain).await?;
        let amount = native_amount(base_units);

        // The sort key for the native coin is its balance in base units.
        let value = Decimal::from(base_units);

        // The quote price only affects display; a failed lookup still
        // produces a usable record.
        let ids = [NATIVE_ASSET_ID.to_string()];
        let display_value = match self.backend.get_prices(AssetClass::Native, &ids).await {
            Ok(prices) => prices
                .get(NATIVE_ASSET_ID)
                .and_then(|price| amount.checked_mul(*price))
                .map(format_quote_value)
                .unwrap_or_else(|| DISPLAY_VALUE_UNKNOWN.to_string()),
            Err(e) => {
                debug!("native price lookup failed for {address}: {e}");
                DISPLAY_VALUE_UNKNOWN.to_string()
            }
        };

        Ok(vec![AssetRecord {
            id: NATIVE_ASSET_ID.to_string(),
            asset_class: AssetClass::Native,
            display_name: NATIVE_NAME.to_string(),
            symbol: NATIVE_SYMBOL.to_string(),
            amount,
            value,
            display_value,
        }])
    }
}
