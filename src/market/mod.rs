//! Quote and candle sources.
//!
//! Two implementations sit behind the same traits:
//! - [`mock`] - deterministic synthetic data, seeded once per process
//! - [`finnhub`] - the live Finnhub REST API, degrading to mock data per call
//!
//! Which one is used is decided once, by [`connect`], from whether a
//! market-data credential is configured. Neither source ever returns an
//! error: failures are logged and absorbed so that a bad response can at
//! worst produce a stale or synthetic view.

pub mod finnhub;
pub mod mock;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::MarketConfig;
use crate::models::{Candle, Quote};

pub use finnhub::{FinnhubClient, FinnhubMarket};
pub use mock::{BASELINE_SYMBOL, HISTORY_DAYS, MockMarket, mock_quote};

/// Candle resolution requested from the provider (daily).
pub const DEFAULT_RESOLUTION: &str = "D";

/// Fetches point-in-time quotes.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Returns a quote for `symbol`. Always yields a value; unknown symbols
    /// and failed requests fall back to mock data.
    async fn fetch_quote(&self, symbol: &str) -> Quote;
}

/// Fetches historical candle series.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Returns up to `range_days` of candles for `symbol`, oldest first.
    ///
    /// `resolution` is passed through to the provider untouched.
    async fn fetch_candles(&self, symbol: &str, resolution: &str, range_days: u32) -> Vec<Candle>;
}

/// Where market data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Live,
    Mock,
}

impl DataMode {
    /// Returns a short status label for display.
    pub fn label(&self) -> &'static str {
        match self {
            DataMode::Live => "Live Feed",
            DataMode::Mock => "Simulated",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A combined quote and candle source.
pub trait MarketData: QuoteSource + CandleSource {
    fn mode(&self) -> DataMode;
}

/// Selects the market-data source for the session.
///
/// # Errors
///
/// Returns [`DeskError::Http`](crate::DeskError::Http) if the HTTP client
/// for live mode cannot be built.
pub fn connect(config: &MarketConfig) -> crate::Result<Arc<dyn MarketData>> {
    let fallback = MockMarket::from_config(config);

    match config.api_key.as_deref() {
        Some(api_key) => {
            let client = FinnhubClient::new(&config.base_url, api_key)?;
            info!(url = %config.base_url, "Using live market data");
            Ok(Arc::new(FinnhubMarket::new(client, fallback.without_latency())))
        }
        None => {
            warn!(
                seed = fallback.seed(),
                "No market-data credential configured, serving simulated data"
            );
            Ok(Arc::new(fallback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_without_key_selects_mock() {
        let config = MarketConfig {
            mock_seed: Some(7),
            ..MarketConfig::default()
        };
        let market = connect(&config).unwrap();
        assert_eq!(market.mode(), DataMode::Mock);
    }

    #[test]
    fn connect_with_key_selects_live() {
        let config = MarketConfig {
            api_key: Some("key".into()),
            ..MarketConfig::default()
        };
        let market = connect(&config).unwrap();
        assert_eq!(market.mode(), DataMode::Live);
    }

    #[test]
    fn mode_labels() {
        assert_eq!(DataMode::Live.to_string(), "Live Feed");
        assert_eq!(DataMode::Mock.to_string(), "Simulated");
    }
}
