//! Core error types for the asset aggregation layer.
//!
//! `FetchError` is recovered at the aggregator boundary (a failed asset class
//! contributes nothing), `StoreError` is recovered at the cache boundary
//! (persistence is best-effort). Neither ever reaches UI consumers.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the asset aggregation layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cache store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Input validation failed: {0}")]
    Validation(String),
}

/// Failure of a single asset-class fetch.
///
/// Never propagates past the aggregator: a class whose fetch fails simply
/// contributes an empty record list to the merged view.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The backend call itself failed.
    #[error("Backend call failed: {0}")]
    Backend(String),

    /// The backend answered, but the payload could not be normalized.
    #[error("Backend returned malformed data: {0}")]
    MalformedData(String),

    /// The fetcher exceeded its per-fetcher time bound.
    #[error("Fetcher timed out")]
    Timeout,
}

/// Failure of the durable warm-start store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read persisted cache: {0}")]
    Read(String),

    #[error("Failed to write persisted cache: {0}")]
    Write(String),

    #[error("Failed to decode persisted cache: {0}")]
    Decode(String),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
