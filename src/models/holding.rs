//! Derived portfolio models.

use rust_decimal::Decimal;
use serde::Serialize;

/// Per-symbol aggregate derived from the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub value: Decimal,
    /// Share of the total portfolio value, in percent with one decimal.
    pub percentage: Decimal,
    /// Display colour for allocation charts (`#rrggbb`).
    pub color: &'static str,
}

/// Holdings plus their summed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub total_value: Decimal,
}

impl Portfolio {
    /// Returns the holding for `symbol`, if any.
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}
