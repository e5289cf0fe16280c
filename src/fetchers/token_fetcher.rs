use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use rust_decimal::Decimal;

use super::fetchers_traits::AssetFetcher;
use crate::assets::{
    format_quote_value, token_amount, AssetClass, AssetRecord, ChainId, DISPLAY_VALUE_UNKNOWN,
};
use crate::backend::{RawHolding, WalletBackend};
use crate::constants::HOLDINGS_PAGE_SIZE;
use crate::errors::FetchError;

/// Fetcher for one fungible token class served by the paged holdings
/// endpoint.
///
/// Pages through the list call, then issues a single batched price lookup
/// for exactly the returned identifiers - never for an empty set.
pub struct TokenFetcher {
    backend: Arc<dyn WalletBackend>,
    class: AssetClass,
}

impl TokenFetcher {
    pub fn new(backend: Arc<dyn WalletBackend>, class: AssetClass) -> Self {
        debug_assert!(!class.is_native(), "use NativeFetcher for the native coin");
        Self { backend, class }
    }

    async fn list_all(
        &self,
        address: &str,
        chain: ChainId,
    ) -> Result<Vec<RawHolding>, FetchError> {
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            let batch = self
                .backend
                .list_holdings(self.class, address, chain, page, HOLDINGS_PAGE_SIZE)
                .await?;
            let last_page = (batch.len() as u32) < HOLDINGS_PAGE_SIZE;
            all.extend(batch);
            if last_page {
                return Ok(all);
            }
            page += 1;
        }
    }

    fn normalize(
        &self,
        holding: RawHolding,
        price: Option<&Decimal>,
    ) -> Result<AssetRecord, FetchError> {
        let amount = token_amount(holding.raw_amount, holding.decimals)
            .map_err(|e| FetchError::MalformedData(e.to_string()))?;
        let (value, display_value) = match price.and_then(|p| amount.checked_mul(*p)) {
            Some(value) => {
                let display = if self.class.priced_in_base_units() {
                    // Base-unit priced classes have no quote-currency figure.
                    DISPLAY_VALUE_UNKNOWN.to_string()
                } else {
                    format_quote_value(value)
                };
                (value, display)
            }
            None => (Decimal::ZERO, DISPLAY_VALUE_UNKNOWN.to_string()),
        };
        Ok(AssetRecord {
            id: holding.id,
            asset_class: self.class,
            display_name: holding.name,
            symbol: holding.symbol,
            amount,
            value,
            display_value,
        })
    }
}

#[async_trait]
impl AssetFetcher for TokenFetcher {
    fn class(&self) -> AssetClass {
        self.class
    }

    async fn fetch(&self, address: &str, chain: ChainId) -> Result<Vec<AssetRecord>, FetchError> {
        let holdings = self.list_all(address, chain).await?;
        if holdings.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = holdings.iter().map(|h| h.id.clone()).collect();
        let prices = match self.backend.get_prices(self.class, &ids).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(
                    "price lookup failed for {} holdings of {address}: {e}; values unavailable",
                    self.class
                );
                Default::default()
            }
        };

        holdings
            .into_iter()
            .map(|holding| {
                let price = prices.get(&holding.id);
                self.normalize(holding, price)
            })
            .collect()
    }
}
