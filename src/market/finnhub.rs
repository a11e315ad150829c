//! Live market data from the Finnhub REST API.
//!
//! [`FinnhubClient`] performs the raw requests and reports every failure.
//! [`FinnhubMarket`] wraps it with the per-call fallback policy: a failed
//! quote or candle request is logged and answered with mock data for that
//! symbol, leaving later calls free to succeed again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::mock::MockMarket;
use super::{CandleSource, DataMode, MarketData, QuoteSource};
use crate::DeskError;
use crate::config::REQUEST_TIMEOUT;
use crate::models::{Candle, CandleHistoryResponse, Quote};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Thin client for the Finnhub `/quote` and `/stock/candle` endpoints.
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl FinnhubClient {
    /// Creates a client for `base_url` authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> crate::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches the current quote for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeskError`] if the request fails, the server answers with
    /// an error status, or the body is not a quote.
    pub async fn quote(&self, symbol: &str) -> crate::Result<Quote> {
        let response = self
            .http
            .get(format!("{}/quote", self.base_url))
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let quote = response.error_for_status()?.json::<Quote>().await?;
        debug!(symbol, price = quote.current, "Fetched quote");
        Ok(quote)
    }

    /// Fetches the candles of the last `range_days` days for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeskError`] if the request fails, the provider reports no
    /// data, or the columns are ragged or out of time order.
    pub async fn candles(
        &self,
        symbol: &str,
        resolution: &str,
        range_days: u32,
    ) -> crate::Result<Vec<Candle>> {
        let to = Utc::now().timestamp();
        let from = to - i64::from(range_days) * SECONDS_PER_DAY;
        let (from, to) = (from.to_string(), to.to_string());

        let response = self
            .http
            .get(format!("{}/stock/candle", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("resolution", resolution),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let body = response
            .error_for_status()?
            .json::<CandleHistoryResponse>()
            .await?;

        if !body.is_ok() {
            return Err(DeskError::Fetch(format!(
                "no candle data for {symbol} (status {:?})",
                body.status
            )));
        }

        let candles = body
            .into_candles()
            .ok_or_else(|| DeskError::Fetch(format!("ragged candle columns for {symbol}")))?;

        if !candles.is_sorted_by_key(|c| c.time.unix_seconds()) {
            return Err(DeskError::Fetch(format!("candles for {symbol} out of order")));
        }

        debug!(symbol, candles = candles.len(), "Fetched candles");
        Ok(candles)
    }
}

/// Live source that degrades to mock data whenever a request fails.
#[derive(Debug)]
pub struct FinnhubMarket {
    client: FinnhubClient,
    fallback: MockMarket,
    fallbacks: AtomicU64,
}

impl FinnhubMarket {
    #[must_use]
    pub fn new(client: FinnhubClient, fallback: MockMarket) -> Self {
        Self {
            client,
            fallback,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Number of calls answered with fallback data so far.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QuoteSource for FinnhubMarket {
    async fn fetch_quote(&self, symbol: &str) -> Quote {
        match self.client.quote(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(symbol, error = %e, "Quote fetch failed, serving mock quote");
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.fallback.quote(symbol)
            }
        }
    }
}

#[async_trait]
impl CandleSource for FinnhubMarket {
    async fn fetch_candles(&self, symbol: &str, resolution: &str, range_days: u32) -> Vec<Candle> {
        match self.client.candles(symbol, resolution, range_days).await {
            Ok(candles) => candles,
            Err(e) => {
                warn!(symbol, error = %e, "Candle fetch failed, serving mock candles");
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.fallback.candles(symbol, range_days)
            }
        }
    }
}

impl MarketData for FinnhubMarket {
    fn mode(&self) -> DataMode {
        DataMode::Live
    }
}
