//! Per-asset-class fetchers.
//!
//! One fetcher per asset class wraps the backend calls for that class and
//! normalizes the results into [`AssetRecord`](crate::assets::AssetRecord)s.
//! Fetchers are idempotent and side-effect-free; a failed fetch surfaces as
//! a `FetchError` that the aggregator converts into an empty contribution.

mod fetchers_traits;
mod native_fetcher;
mod token_fetcher;


pub use fetchers_traits::AssetFetcher;
pub use native_fetcher::NativeFetcher;
pub use token_fetcher::TokenFetcher;
