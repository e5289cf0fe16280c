//! Asset aggregation - concurrent fan-out over the per-class fetchers.

mod aggregator_service;

#[cfg(test)]
mod aggregator_service_tests;

pub use aggregator_service::{AssetAggregator, AssetAggregatorTrait};
