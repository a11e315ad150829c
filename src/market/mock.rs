//! Deterministic synthetic market data.
//!
//! Quotes come from a small fixed table. Candle histories are random walks
//! generated once, when the [`MockMarket`] is built, from a single seed, so
//! every call within a process sees the same series.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{CandleSource, DataMode, MarketData, QuoteSource};
use crate::config::MarketConfig;
use crate::models::{Candle, CandleTime, Quote};

/// Symbol whose data is served for anything the mock does not know.
pub const BASELINE_SYMBOL: &str = "AAPL";

/// Length of the generated candle history.
pub const HISTORY_DAYS: u32 = 30;

const QUOTE_LATENCY: Duration = Duration::from_millis(400);
const CANDLE_LATENCY: Duration = Duration::from_millis(600);

/// Daily volatility of the random walk, as a fraction of price.
const DAILY_VOLATILITY: f64 = 0.02;

/// Known symbols and the price their generated history starts from.
const MOCK_SYMBOLS: [(&str, f64); 3] = [("AAPL", 150.0), ("TSLA", 200.0), ("NVDA", 440.0)];

/// Returns the fixed mock quote for `symbol`, or the baseline quote.
pub fn mock_quote(symbol: &str) -> Quote {
    match symbol {
        "TSLA" => Quote {
            current: 210.50,
            change: -2.30,
            percent_change: -1.08,
            high: 215.00,
            low: 208.00,
            open: 212.00,
            previous_close: 212.80,
        },
        "NVDA" => Quote {
            current: 450.00,
            change: 5.00,
            percent_change: 1.12,
            high: 455.00,
            low: 445.00,
            open: 448.00,
            previous_close: 445.00,
        },
        _ => Quote {
            current: 152.45,
            change: 1.25,
            percent_change: 0.82,
            high: 153.00,
            low: 150.50,
            open: 151.00,
            previous_close: 151.20,
        },
    }
}

/// Synthetic quote and candle source.
#[derive(Debug, Clone)]
pub struct MockMarket {
    seed: u64,
    histories: HashMap<String, Vec<Candle>>,
    quote_latency: Duration,
    candle_latency: Duration,
}

impl MockMarket {
    /// Generates histories ending yesterday (UTC) from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::anchored(seed, Utc::now().date_naive())
    }

    /// Generates histories covering the [`HISTORY_DAYS`] days before `today`.
    #[must_use]
    pub fn anchored(seed: u64, today: NaiveDate) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let histories = MOCK_SYMBOLS
            .iter()
            .map(|(symbol, start)| {
                let history = generate_history(&mut rng, HISTORY_DAYS, *start, today);
                (symbol.to_string(), history)
            })
            .collect();

        Self {
            seed,
            histories,
            quote_latency: QUOTE_LATENCY,
            candle_latency: CANDLE_LATENCY,
        }
    }

    /// Builds the mock from configuration, drawing a fresh seed when none
    /// is configured.
    #[must_use]
    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.mock_seed.unwrap_or_else(rand::random))
    }

    /// Overrides the simulated network latency.
    #[must_use]
    pub fn with_latency(mut self, quote: Duration, candles: Duration) -> Self {
        self.quote_latency = quote;
        self.candle_latency = candles;
        self
    }

    /// Removes the simulated network latency.
    #[must_use]
    pub fn without_latency(self) -> Self {
        self.with_latency(Duration::ZERO, Duration::ZERO)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the quote for `symbol` without delay.
    pub fn quote(&self, symbol: &str) -> Quote {
        mock_quote(symbol)
    }

    /// Returns the most recent `range_days` candles for `symbol` without
    /// delay. Unknown symbols get the baseline history.
    pub fn candles(&self, symbol: &str, range_days: u32) -> Vec<Candle> {
        let Some(history) = self
            .histories
            .get(symbol)
            .or_else(|| self.histories.get(BASELINE_SYMBOL))
        else {
            return Vec::new();
        };

        let keep = history.len().min(range_days as usize);
        history[history.len() - keep..].to_vec()
    }
}

#[async_trait]
impl QuoteSource for MockMarket {
    async fn fetch_quote(&self, symbol: &str) -> Quote {
        tokio::time::sleep(self.quote_latency).await;
        debug!(symbol, "Serving mock quote");
        self.quote(symbol)
    }
}

#[async_trait]
impl CandleSource for MockMarket {
    async fn fetch_candles(&self, symbol: &str, _resolution: &str, range_days: u32) -> Vec<Candle> {
        tokio::time::sleep(self.candle_latency).await;
        debug!(symbol, range_days, "Serving mock candles");
        self.candles(symbol, range_days)
    }
}

impl MarketData for MockMarket {
    fn mode(&self) -> DataMode {
        DataMode::Mock
    }
}

/// Random walk of `days` daily candles ending the day before `today`.
fn generate_history(rng: &mut StdRng, days: u32, start: f64, today: NaiveDate) -> Vec<Candle> {
    let mut price = start;
    let mut candles = Vec::with_capacity(days as usize);

    for offset in (1..=days).rev() {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            continue;
        };

        let volatility = price * DAILY_VOLATILITY;
        let change = (rng.random::<f64>() - 0.5) * volatility;
        let open = price;
        let close = price + change;
        let high = open.max(close) + rng.random::<f64>() * volatility * 0.5;
        let low = open.min(close) - rng.random::<f64>() * volatility * 0.5;
        let volume = rng.random_range(500_000..1_500_000);

        candles.push(Candle {
            time: CandleTime::Date(date),
            open: round_cents(open),
            high: round_cents(high),
            low: round_cents(low),
            close: round_cents(close),
            volume: Some(volume),
        });
        price = close;
    }

    candles
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
