/// Sentinel asset id for the chain's native coin.
pub const NATIVE_ASSET_ID: &str = "native";

/// Ticker symbol of the native coin.
pub const NATIVE_SYMBOL: &str = "BTC";

/// Display name of the native coin.
pub const NATIVE_NAME: &str = "Bitcoin";

/// Decimal places of the native coin (satoshi base units).
pub const NATIVE_DECIMALS: u32 = 8;

/// Decimal places used for quote-currency display values.
pub const QUOTE_DISPLAY_DECIMALS: u32 = 2;

/// Display marker used when no quote price is available for an asset.
pub const DISPLAY_VALUE_UNKNOWN: &str = "unknown";
