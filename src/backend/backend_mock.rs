//! Scriptable in-memory backend for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::backend_model::RawHolding;
use super::backend_traits::WalletBackend;
use crate::assets::{AssetClass, ChainId};
use crate::errors::FetchError;

#[derive(Default)]
struct MockState {
    native_balances: HashMap<String, u64>,
    holdings: HashMap<AssetClass, Vec<RawHolding>>,
    prices: HashMap<(AssetClass, String), Decimal>,
    failing_classes: HashSet<AssetClass>,
    failing_price_classes: HashSet<AssetClass>,
    delays: HashMap<AssetClass, Duration>,
    list_calls: HashMap<AssetClass, u32>,
    price_calls: Vec<(AssetClass, Vec<String>)>,
    native_calls: u32,
}

/// Mock backend for testing - scripted responses plus call recording.
///
/// Per-class failures and delays let tests exercise partial failure,
/// timeouts, and request coalescing without a real backend.
#[derive(Clone, Default)]
pub struct MockWalletBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockWalletBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_native_balance(&self, address: &str, base_units: u64) {
        self.state
            .lock()
            .unwrap()
            .native_balances
            .insert(address.to_string(), base_units);
    }

    pub fn set_holdings(&self, class: AssetClass, holdings: Vec<RawHolding>) {
        self.state.lock().unwrap().holdings.insert(class, holdings);
    }

    pub fn set_price(&self, class: AssetClass, id: &str, price: Decimal) {
        self.state
            .lock()
            .unwrap()
            .prices
            .insert((class, id.to_string()), price);
    }

    /// Makes every call for `class` fail until cleared.
    pub fn fail_class(&self, class: AssetClass) {
        self.state.lock().unwrap().failing_classes.insert(class);
    }

    /// Makes only the price lookups for `class` fail; list calls succeed.
    pub fn fail_prices(&self, class: AssetClass) {
        self.state
            .lock()
            .unwrap()
            .failing_price_classes
            .insert(class);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_classes.clear();
        state.failing_price_classes.clear();
    }

    /// Delays every call for `class` by `delay`.
    pub fn set_delay(&self, class: AssetClass, delay: Duration) {
        self.state.lock().unwrap().delays.insert(class, delay);
    }

    pub fn list_call_count(&self, class: AssetClass) -> u32 {
        *self
            .state
            .lock()
            .unwrap()
            .list_calls
            .get(&class)
            .unwrap_or(&0)
    }

    pub fn native_call_count(&self) -> u32 {
        self.state.lock().unwrap().native_calls
    }

    /// Every recorded price lookup, with the exact id set requested.
    pub fn price_calls(&self) -> Vec<(AssetClass, Vec<String>)> {
        self.state.lock().unwrap().price_calls.clone()
    }

    async fn pause(&self, class: AssetClass) {
        let delay = self.state.lock().unwrap().delays.get(&class).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_failure(&self, class: AssetClass) -> Result<(), FetchError> {
        if self.state.lock().unwrap().failing_classes.contains(&class) {
            return Err(FetchError::Backend(format!("scripted failure for {class}")));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletBackend for MockWalletBackend {
    async fn list_holdings(
        &self,
        class: AssetClass,
        _address: &str,
        _chain: ChainId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RawHolding>, FetchError> {
        self.pause(class).await;
        {
            let mut state = self.state.lock().unwrap();
            *state.list_calls.entry(class).or_insert(0) += 1;
        }
        self.check_failure(class)?;
        let all = self
            .state
            .lock()
            .unwrap()
            .holdings
            .get(&class)
            .cloned()
            .unwrap_or_default();
        Ok(all
            .into_iter()
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .collect())
    }

    async fn get_prices(
        &self,
        class: AssetClass,
        ids: &[String],
    ) -> Result<HashMap<String, Decimal>, FetchError> {
        self.pause(class).await;
        {
            let mut state = self.state.lock().unwrap();
            state.price_calls.push((class, ids.to_vec()));
            if state.failing_price_classes.contains(&class) {
                return Err(FetchError::Backend(format!(
                    "scripted price failure for {class}"
                )));
            }
        }
        self.check_failure(class)?;
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .prices
                    .get(&(class, id.clone()))
                    .map(|price| (id.clone(), *price))
            })
            .collect())
    }

    async fn get_native_balance(
        &self,
        address: &str,
        _chain: ChainId,
    ) -> Result<u64, FetchError> {
        self.pause(AssetClass::Native).await;
        {
            let mut state = self.state.lock().unwrap();
            state.native_calls += 1;
        }
        self.check_failure(AssetClass::Native)?;
        let state = self.state.lock().unwrap();
        Ok(state.native_balances.get(address).copied().unwrap_or(0))
    }
}
