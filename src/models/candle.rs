//! OHLC candlestick models.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Start of a candle's time bucket.
///
/// Daily candles carry a calendar date (`"2024-01-01"`); candles from the
/// live provider carry a unix timestamp in seconds. Both shapes appear on
/// the wire untagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandleTime {
    Date(NaiveDate),
    Timestamp(i64),
}

impl CandleTime {
    /// Returns the bucket start as unix seconds. A date maps to its UTC midnight.
    ///
    /// This is the ordering key of a series; the two variants compare by it.
    pub fn unix_seconds(&self) -> i64 {
        match self {
            CandleTime::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default(),
            CandleTime::Timestamp(secs) => *secs,
        }
    }
}

impl fmt::Display for CandleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandleTime::Date(date) => write!(f, "{date}"),
            CandleTime::Timestamp(secs) => write!(f, "{secs}"),
        }
    }
}

impl From<NaiveDate> for CandleTime {
    fn from(date: NaiveDate) -> Self {
        CandleTime::Date(date)
    }
}

impl From<i64> for CandleTime {
    fn from(secs: i64) -> Self {
        CandleTime::Timestamp(secs)
    }
}

/// A single OHLC candlestick bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: CandleTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl Candle {
    /// Returns `true` if `low <= open, close <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// Candle history response from the Finnhub `/stock/candle` endpoint.
///
/// Columns are parallel arrays; `s` is `"ok"` when data was found and
/// `"no_data"` otherwise, in which case the arrays are absent.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleHistoryResponse {
    #[serde(rename = "s")]
    pub status: String,
    #[serde(rename = "t", default)]
    pub timestamps: Vec<i64>,
    #[serde(rename = "o", default)]
    pub open: Vec<f64>,
    #[serde(rename = "h", default)]
    pub high: Vec<f64>,
    #[serde(rename = "l", default)]
    pub low: Vec<f64>,
    #[serde(rename = "c", default)]
    pub close: Vec<f64>,
    #[serde(rename = "v", default)]
    pub volume: Vec<f64>,
}

impl CandleHistoryResponse {
    /// Returns `true` if the provider reported data for the request.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Zips the parallel columns into candles.
    ///
    /// Returns `None` when the price columns disagree in length. A missing
    /// or short volume column leaves `volume` unset.
    pub fn into_candles(self) -> Option<Vec<Candle>> {
        let len = self.timestamps.len();
        if [self.open.len(), self.high.len(), self.low.len(), self.close.len()]
            .iter()
            .any(|&n| n != len)
        {
            return None;
        }

        let candles = (0..len)
            .map(|i| Candle {
                time: CandleTime::Timestamp(self.timestamps[i]),
                open: self.open[i],
                high: self.high[i],
                low: self.low[i],
                close: self.close[i],
                volume: self
                    .volume
                    .get(i)
                    .filter(|v| **v >= 0.0)
                    .map(|v| *v as u64),
            })
            .collect();
        Some(candles)
    }
}
