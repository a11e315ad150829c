//! The dashboard facade.
//!
//! [`TradeDesk`] wires the market sources, the candle aggregator, the
//! polling controller and the trade ledger together the way a dashboard
//! drives them: pick a symbol, watch its chart, price and buy, then refresh
//! the history and allocation.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::info;

use crate::DeskError;
use crate::aggregator::{CandleAggregator, SharedAggregator};
use crate::config::AppConfig;
use crate::ledger::{LedgerBackend, TradeLedger};
use crate::market::{self, DataMode, MarketData};
use crate::models::{Candle, OrderRequest, Portfolio, Quote, Trade};
use crate::polling::{PollEvent, PollingController};
use crate::portfolio;

/// Result of a completed buy.
#[derive(Debug, Clone)]
pub struct Execution {
    pub trade: Trade,
    /// Full history re-read after the write, most recent first.
    pub history: Vec<Trade>,
    pub portfolio: Portfolio,
}

/// Session state behind a trading dashboard.
pub struct TradeDesk {
    market: Arc<dyn MarketData>,
    aggregator: SharedAggregator,
    poller: PollingController,
    ledger: TradeLedger,
}

impl TradeDesk {
    /// Builds a desk from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let market = market::connect(&config.market)?;
        let ledger = TradeLedger::open(&config.ledger)?;
        Ok(Self::new(market, ledger))
    }

    /// Builds a desk over explicit sources.
    #[must_use]
    pub fn new(market: Arc<dyn MarketData>, ledger: TradeLedger) -> Self {
        let aggregator = CandleAggregator::shared();
        let poller = PollingController::new(Arc::clone(&market), Arc::clone(&aggregator));
        Self {
            market,
            aggregator,
            poller,
            ledger,
        }
    }

    /// Sets the quote polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Reports polling outcomes on `events`.
    #[must_use]
    pub fn with_poll_events(mut self, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        self.poller = self.poller.with_events(events);
        self
    }

    pub fn market_mode(&self) -> DataMode {
        self.market.mode()
    }

    pub fn ledger_backend(&self) -> LedgerBackend {
        self.ledger.backend()
    }

    pub fn aggregator(&self) -> SharedAggregator {
        Arc::clone(&self.aggregator)
    }

    pub fn active_symbol(&self) -> Option<String> {
        self.poller.active_symbol()
    }

    /// Makes `symbol` the charted symbol: loads its candles and starts
    /// polling its quote.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidOrder`] for a blank symbol and
    /// [`DeskError::InvalidSeries`] if the loaded candles are out of order.
    pub async fn select_symbol(&mut self, symbol: &str) -> crate::Result<()> {
        let symbol = normalize(symbol)?;
        self.poller.switch_symbol(&symbol).await?;
        info!(symbol, mode = %self.market.mode(), "Symbol selected");
        Ok(())
    }

    /// Stops quote polling. The chart keeps its last state.
    pub fn stop_polling(&mut self) {
        self.poller.stop();
    }

    /// Returns the current chart series.
    pub async fn candles(&self) -> Vec<Candle> {
        self.aggregator.lock().await.snapshot()
    }

    /// Fetches a quote to price an order.
    pub async fn check_price(&self, symbol: &str) -> Quote {
        self.market.fetch_quote(symbol.trim()).await
    }

    /// Buys `quantity` shares of `symbol` at the current quote.
    ///
    /// The portfolio in the result is recomputed from the ledger after the
    /// write; nothing is applied before the store accepts the trade.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidOrder`] if the order is malformed or the
    /// quote has no usable price, and [`DeskError::Persistence`] if the
    /// ledger cannot be written or re-read.
    pub async fn execute_buy(&self, symbol: &str, quantity: u64) -> crate::Result<Execution> {
        let symbol = normalize(symbol)?;
        let quote = self.market.fetch_quote(&symbol).await;
        let price = Decimal::try_from(quote.current).map_err(|_| {
            DeskError::InvalidOrder(format!("no usable price for {symbol}: {}", quote.current))
        })?;

        let trade = self
            .ledger
            .write(OrderRequest::buy(&symbol, price, quantity))
            .await?;
        let history = self.ledger.read().await?;
        let portfolio = portfolio::valuate(&history);

        Ok(Execution {
            trade,
            history,
            portfolio,
        })
    }

    /// Returns the trade history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`] if the ledger cannot be read.
    pub async fn history(&self) -> crate::Result<Vec<Trade>> {
        self.ledger.read().await
    }

    /// Values the current trade history.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`] if the ledger cannot be read.
    pub async fn portfolio(&self) -> crate::Result<Portfolio> {
        let history = self.ledger.read().await?;
        Ok(portfolio::valuate(&history))
    }
}

fn normalize(symbol: &str) -> crate::Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(DeskError::InvalidOrder("symbol must not be empty".into()));
    }
    Ok(symbol.to_uppercase())
}
