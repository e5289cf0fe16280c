use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signals pushed into the asset layer from the rest of the wallet process.
///
/// These flow opposite to the data: consumers and platform adapters emit
/// them, the session translates them into cache invalidation, eviction, or
/// in-place repricing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    /// A balance change was observed for an account address.
    BalanceChanged { address: String },

    /// The account was removed from the wallet.
    AccountRemoved { address: String },

    /// The price ticker pushed a new native-coin quote.
    NativeQuoteChanged { price: Decimal },
}

impl WalletEvent {
    pub fn balance_changed(address: impl Into<String>) -> Self {
        Self::BalanceChanged {
            address: address.into(),
        }
    }

    pub fn account_removed(address: impl Into<String>) -> Self {
        Self::AccountRemoved {
            address: address.into(),
        }
    }

    pub fn native_quote_changed(price: Decimal) -> Self {
        Self::NativeQuoteChanged { price }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wallet_event_serialization() {
        let event = WalletEvent::balance_changed("bc1qalice");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("balance_changed"));

        let back: WalletEvent = serde_json::from_str(&json).unwrap();
        match back {
            WalletEvent::BalanceChanged { address } => assert_eq!(address, "bc1qalice"),
            _ => panic!("Expected BalanceChanged"),
        }
    }

    #[test]
    fn test_quote_event_round_trip() {
        let event = WalletEvent::native_quote_changed(dec!(60000.5));
        let json = serde_json::to_string(&event).unwrap();
        let back: WalletEvent = serde_json::from_str(&json).unwrap();
        match back {
            WalletEvent::NativeQuoteChanged { price } => assert_eq!(price, dec!(60000.5)),
            _ => panic!("Expected NativeQuoteChanged"),
        }
    }
}
