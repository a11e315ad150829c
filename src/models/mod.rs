//! Shared models for market data, trades, and derived holdings.
//!
//! Market data (candles and quotes) keeps the provider's floating-point
//! prices. Trade prices are decimals so that valuation sums are exact.

pub mod candle;
pub mod holding;
pub mod quote;
pub mod trade;

pub use candle::{Candle, CandleHistoryResponse, CandleTime};
pub use holding::{Holding, Portfolio};
pub use quote::Quote;
pub use trade::{OrderRequest, Side, Trade, TradeStatus};
