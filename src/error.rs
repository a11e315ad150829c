//! Crate-level error types.
//!
//! [`DeskError`] unifies every failure the core can report (configuration,
//! market-data fetches, candle loading, ledger persistence) behind a single
//! enum so callers can match on the variant they care about while still
//! using the `?` operator for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeskError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// An environment value was present but unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A quote or candle request failed. Absorbed by the market sources,
    /// which degrade to mock data instead of propagating it.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A candle series handed to the aggregator was not sorted by time.
    #[error("invalid candle series: {0}")]
    InvalidSeries(String),

    /// The trade ledger's backing store rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An order candidate failed validation before reaching a store.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// An HTTP request failed at the transport or status level.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
