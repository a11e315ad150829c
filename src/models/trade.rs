//! Trade ledger models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::DeskError;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the wire name (`"BUY"` or `"SELL"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Settlement state of a trade. A filled trade never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Filled,
    Pending,
}

impl TradeStatus {
    /// Returns the wire name (`"FILLED"` or `"PENDING"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Filled => "FILLED",
            TradeStatus::Pending => "PENDING",
        }
    }
}

/// An executed trade as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
    /// Creation instant in unix milliseconds.
    pub timestamp: u64,
    pub status: TradeStatus,
}

impl Trade {
    /// Returns `price * quantity`, saturating at [`Decimal::MAX`].
    pub fn value(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A trade candidate submitted to the ledger before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
}

impl OrderRequest {
    /// Creates a buy candidate.
    pub fn buy(symbol: impl Into<String>, price: Decimal, quantity: u64) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Buy,
            price,
            quantity,
        }
    }

    /// Returns the cost of the order (`price * quantity`), or `None` when
    /// it does not fit in a [`Decimal`].
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }

    /// Checks that the candidate can be recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidOrder`] for a blank symbol, a
    /// non-positive price, a zero quantity, or a cost too large to represent.
    pub fn validate(&self) -> crate::Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(DeskError::InvalidOrder("symbol is empty".into()));
        }
        if self.price <= Decimal::ZERO {
            return Err(DeskError::InvalidOrder(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if self.quantity == 0 {
            return Err(DeskError::InvalidOrder("quantity must be positive".into()));
        }
        if self.notional().is_none() {
            return Err(DeskError::InvalidOrder(format!(
                "order value overflows: {} x {}",
                self.price, self.quantity
            )));
        }
        Ok(())
    }

    /// Finalizes the candidate into a filled trade. The symbol is trimmed
    /// and upper-cased.
    pub(crate) fn fill(self, id: String, timestamp: u64) -> Trade {
        Trade {
            id,
            symbol: self.symbol.trim().to_uppercase(),
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            timestamp,
            status: TradeStatus::Filled,
        }
    }
}
