//! In-memory candle series for the active symbol.
//!
//! [`CandleAggregator`] holds the series loaded from a candle source and
//! folds quote ticks into its last (in-progress) candle. Earlier candles are
//! never touched after a load.
//!
//! A tick is assumed to belong to the same bucket as the last candle. Period
//! rollover is not detected: a tick arriving after the bucket closed still
//! updates that bucket.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::DeskError;
use crate::models::{Candle, Quote};

/// Aggregator shared between the polling task and the presentation layer.
pub type SharedAggregator = Arc<Mutex<CandleAggregator>>;

/// Owns the candle series of one symbol.
#[derive(Debug, Default)]
pub struct CandleAggregator {
    series: Vec<Candle>,
}

impl CandleAggregator {
    /// Creates an aggregator with an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self { series: Vec::new() }
    }

    /// Creates an empty aggregator wrapped for sharing across tasks.
    #[must_use]
    pub fn shared() -> SharedAggregator {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Replaces the series wholesale.
    ///
    /// An empty series is valid; ticks are ignored until the next load.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidSeries`] if the candles are not sorted by
    /// non-decreasing time. The current series is kept in that case.
    pub fn load(&mut self, series: Vec<Candle>) -> crate::Result<()> {
        if let Some(pos) = series
            .windows(2)
            .position(|w| w[0].time.unix_seconds() > w[1].time.unix_seconds())
        {
            return Err(DeskError::InvalidSeries(format!(
                "candle {} at {} precedes candle {} at {}",
                pos + 1,
                series[pos + 1].time,
                pos,
                series[pos].time
            )));
        }

        debug!(candles = series.len(), "Loaded candle series");
        self.series = series;
        Ok(())
    }

    /// Folds a quote into the last candle.
    ///
    /// Sets `close` to the quote's current price and widens `high`/`low` to
    /// include it. `open` and `time` stay as loaded. Returns `false` without
    /// doing anything when the series is empty.
    pub fn merge_tick(&mut self, quote: &Quote) -> bool {
        let Some(last) = self.series.last_mut() else {
            return false;
        };

        let price = quote.current;
        last.close = price;
        last.high = last.high.max(price);
        last.low = last.low.min(price);
        true
    }

    /// Returns a copy of the series in time order.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.series.clone()
    }

    /// Returns the in-progress candle.
    pub fn last(&self) -> Option<&Candle> {
        self.series.last()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
