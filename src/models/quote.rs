//! Point-in-time quote model.

use serde::{Deserialize, Serialize};

/// A quote snapshot as served by the Finnhub `/quote` endpoint.
///
/// The wire format uses single-letter keys; they are mapped to descriptive
/// field names here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Current (last) price.
    #[serde(rename = "c")]
    pub current: f64,
    /// Absolute change against the previous close.
    #[serde(rename = "d")]
    pub change: f64,
    /// Percent change against the previous close.
    #[serde(rename = "dp")]
    pub percent_change: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "pc")]
    pub previous_close: f64,
}
