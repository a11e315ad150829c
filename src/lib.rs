//! Market-data aggregation and portfolio valuation core for a trading
//! dashboard.
//!
//! Maintains a daily candle series that live quote ticks are folded into,
//! records simulated trades in an append-only ledger, and derives portfolio
//! allocation from that ledger. Market data and persistence each switch
//! between a live backend and a local stand-in, decided once from
//! configuration.

pub mod aggregator;
pub mod config;
pub mod desk;
pub mod error;
pub mod ledger;
pub mod market;
pub mod models;
pub mod polling;
pub mod portfolio;

pub use error::{DeskError, Result};
