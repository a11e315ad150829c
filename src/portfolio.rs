//! Portfolio valuation from the trade ledger.
//!
//! Holdings are recomputed from the full trade list on every call. Every
//! trade adds `price * quantity` to its symbol regardless of side; sells are
//! not netted against earlier buys.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Holding, Portfolio, Trade};

/// Colours assigned to holdings in order, wrapping around.
pub const CHART_COLORS: [&str; 5] = [
    "#3b82f6", // blue
    "#10b981", // green
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // purple
];

/// Groups `trades` by symbol and computes each symbol's share of the total.
///
/// Holdings appear in the order their symbol first occurs in `trades`.
/// Percentages are rounded to one decimal, half away from zero, and are
/// zero when the total value is zero. Sums saturate at [`Decimal::MAX`].
pub fn valuate(trades: &[Trade]) -> Portfolio {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut values: Vec<(&str, Decimal)> = Vec::new();

    for trade in trades {
        let slot = *index.entry(trade.symbol.as_str()).or_insert_with(|| {
            values.push((trade.symbol.as_str(), Decimal::ZERO));
            values.len() - 1
        });
        values[slot].1 = values[slot].1.saturating_add(trade.value());
    }

    let total_value = values
        .iter()
        .fold(Decimal::ZERO, |total, (_, value)| total.saturating_add(*value));

    let holdings = values
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, value))| Holding {
            symbol: symbol.to_string(),
            value,
            percentage: percentage_of(value, total_value),
            color: CHART_COLORS[i % CHART_COLORS.len()],
        })
        .collect();

    Portfolio {
        holdings,
        total_value,
    }
}

fn percentage_of(value: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    value
        .checked_div(total)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
