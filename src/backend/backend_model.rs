use serde::{Deserialize, Serialize};

/// One holding row as returned by the backend list endpoint, before
/// normalization into an [`AssetRecord`](crate::assets::AssetRecord).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHolding {
    /// On-chain identifier of the asset.
    pub id: String,
    pub name: String,
    pub symbol: String,
    /// Quantity in the token's smallest indivisible unit.
    pub raw_amount: u128,
    /// Decimal places of the token.
    pub decimals: u32,
}
