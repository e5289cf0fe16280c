use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::assets_constants::{
    DISPLAY_VALUE_UNKNOWN, NATIVE_DECIMALS, QUOTE_DISPLAY_DECIMALS,
};
use crate::errors::{Error, Result};

/// One category of holding tracked by the wallet.
///
/// `Native` is the chain's native coin and is always fetched; the remaining
/// classes are optional per session. The set is fixed: adding a class means
/// adding a fetcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClass {
    Native,
    Brc20,
    Arc20,
    Stable,
    Rune,
}

impl AssetClass {
    /// Every class a session may enable on top of the native coin.
    pub const OPTIONAL: [AssetClass; 4] = [
        AssetClass::Brc20,
        AssetClass::Arc20,
        AssetClass::Stable,
        AssetClass::Rune,
    ];

    pub fn is_native(&self) -> bool {
        matches!(self, AssetClass::Native)
    }

    /// Whether this class's `value` sort key is denominated in the chain's
    /// base unit rather than the quote currency.
    pub fn priced_in_base_units(&self) -> bool {
        matches!(self, AssetClass::Native | AssetClass::Rune)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Native => "native",
            AssetClass::Brc20 => "brc20",
            AssetClass::Arc20 => "arc20",
            AssetClass::Stable => "stable",
            AssetClass::Rune => "rune",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network the wallet is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Mainnet,
    Testnet,
    Signet,
}

impl ChainId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Mainnet => "mainnet",
            ChainId::Testnet => "testnet",
            ChainId::Signet => "signet",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of optional asset classes enabled for a session.
///
/// The native coin is always implied and never stored here. The internal
/// order is canonical (sorted, deduplicated) so two sets built from the same
/// classes compare and hash equal regardless of construction order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnabledClasses(Vec<AssetClass>);

impl EnabledClasses {
    pub fn new(classes: impl IntoIterator<Item = AssetClass>) -> Self {
        let mut classes: Vec<AssetClass> = classes
            .into_iter()
            .filter(|class| !class.is_native())
            .collect();
        classes.sort();
        classes.dedup();
        Self(classes)
    }

    /// Every optional class enabled.
    pub fn all() -> Self {
        Self::new(AssetClass::OPTIONAL)
    }

    /// No optional classes; only the native coin is fetched.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, class: AssetClass) -> bool {
        self.0.contains(&class)
    }

    pub fn iter(&self) -> impl Iterator<Item = AssetClass> + '_ {
        self.0.iter().copied()
    }

    /// Stable fingerprint used in storage keys, e.g. `"brc20+rune"`.
    pub fn fingerprint(&self) -> String {
        if self.0.is_empty() {
            return "none".to_string();
        }
        self.0
            .iter()
            .map(AssetClass::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Composite cache key: one logical session of asset data.
///
/// Two sessions with the same key observe the same cached data; changing any
/// component is a logically new session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub address: String,
    pub chain: ChainId,
    pub enabled: EnabledClasses,
}

impl CacheKey {
    pub fn new(address: impl Into<String>, chain: ChainId, enabled: EnabledClasses) -> Self {
        Self {
            address: address.into(),
            chain,
            enabled,
        }
    }

    /// Flat string form used to key the durable store.
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.address,
            self.chain,
            self.enabled.fingerprint()
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// One holding of one asset type for one address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Stable identifier: the native sentinel or the asset's on-chain id.
    pub id: String,
    pub asset_class: AssetClass,
    pub display_name: String,
    pub symbol: String,
    /// Exact decimal quantity. Never a binary float: classes differ in
    /// decimal places and must round-trip without drift.
    pub amount: Decimal,
    /// Ranking value used only for sort order. Denominated in base units for
    /// `Native` and `Rune`, in the quote currency for every other class, so
    /// it must not be compared across classes for anything but ordering.
    pub value: Decimal,
    /// Formatted quote-currency string, or [`DISPLAY_VALUE_UNKNOWN`] when no
    /// price is available.
    pub display_value: String,
}

impl AssetRecord {
    pub fn has_known_value(&self) -> bool {
        self.display_value != DISPLAY_VALUE_UNKNOWN
    }
}

/// Converts a raw integer quantity and its decimal places into an exact
/// decimal amount.
pub fn token_amount(raw_amount: u128, decimals: u32) -> Result<Decimal> {
    if decimals > 28 {
        return Err(Error::Validation(format!(
            "unsupported decimal places: {decimals}"
        )));
    }
    let mantissa = i128::try_from(raw_amount)
        .map_err(|_| Error::Validation(format!("raw amount out of range: {raw_amount}")))?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map_err(|e| Error::Validation(e.to_string()))
}

/// Converts a native-coin base-unit balance into an exact decimal amount
/// with the coin's full precision.
pub fn native_amount(base_units: u64) -> Decimal {
    // u64 always fits the 96-bit mantissa at scale 8
    Decimal::from_i128_with_scale(i128::from(base_units), NATIVE_DECIMALS)
}

/// Formats an integer base-unit balance as an exact decimal string,
/// e.g. `100_000_000` -> `"1.00000000"`.
pub fn format_base_units(base_units: u64) -> String {
    native_amount(base_units).to_string()
}

/// Parses a display amount back into integer base units. Exact inverse of
/// [`format_base_units`]; rejects negative amounts and sub-base-unit
/// precision.
pub fn parse_base_units(display: &str) -> Result<u64> {
    let parsed =
        Decimal::from_str_exact(display).map_err(|e| Error::Validation(e.to_string()))?;
    if parsed.is_sign_negative() {
        return Err(Error::Validation(format!("negative amount: {display}")));
    }
    let scale_factor = Decimal::from(10u64.pow(NATIVE_DECIMALS));
    let scaled = parsed
        .checked_mul(scale_factor)
        .ok_or_else(|| Error::Validation(format!("amount out of range: {display}")))?;
    if scaled.fract() != Decimal::ZERO {
        return Err(Error::Validation(format!(
            "more precision than the native coin supports: {display}"
        )));
    }
    scaled
        .to_u64()
        .ok_or_else(|| Error::Validation(format!("amount out of range: {display}")))
}

/// Formats a quote-currency value for display, e.g. `"1234.50"`.
///
/// Midpoints round away from zero, the usual currency-display convention;
/// the default strategy would turn `0.005` into `"0.00"`.
pub fn format_quote_value(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(QUOTE_DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(QUOTE_DISPLAY_DECIMALS);
    rounded.to_string()
}
