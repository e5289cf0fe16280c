//! Assets module - domain model for asset records, classes, and cache keys.

mod assets_constants;
mod assets_model;


pub use assets_constants::*;
pub use assets_model::{
    format_base_units, format_quote_value, native_amount, parse_base_units, token_amount,
    AssetClass, AssetRecord, CacheKey, ChainId, EnabledClasses,
};
