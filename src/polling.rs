//! Periodic quote refresh for the active symbol.
//!
//! [`PollingController`] runs one cadence task at a time. Every tick fetches
//! a quote on its own task, so a slow request never delays the next tick, and
//! folds the result into the shared [`CandleAggregator`](crate::aggregator::CandleAggregator).
//!
//! Each start publishes a new subscription (symbol plus generation) on a
//! watch channel. A tick re-checks the subscription while holding the
//! aggregator lock and drops its quote if the symbol changed in the meantime,
//! so a late response can never land in another symbol's series. Ticks of
//! one cadence are numbered, and a quote older than the last merged one is
//! dropped as well.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aggregator::SharedAggregator;
use crate::market::{DEFAULT_RESOLUTION, HISTORY_DAYS, MarketData};

/// Default time between two ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The quote was folded into the last candle.
    Merged { symbol: String, close: f64 },
    /// The series was empty, so nothing was fetched or merged.
    Skipped { symbol: String },
    /// The quote arrived after the symbol changed, or after a later tick's
    /// quote was merged, and was dropped.
    Discarded { symbol: String },
    /// The fetch did not produce a quote.
    Failed { symbol: String, error: String },
}

/// The symbol a cadence is polling for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Subscription {
    symbol: String,
    generation: u64,
}

/// Drives the quote cadence and symbol switches.
pub struct PollingController {
    market: Arc<dyn MarketData>,
    aggregator: SharedAggregator,
    interval: Duration,
    resolution: String,
    range_days: u32,
    subscription: watch::Sender<Option<Subscription>>,
    generation: u64,
    cadence: Option<JoinHandle<()>>,
    events: Option<mpsc::UnboundedSender<PollEvent>>,
}

impl PollingController {
    /// Creates an idle controller polling every [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(market: Arc<dyn MarketData>, aggregator: SharedAggregator) -> Self {
        let (subscription, _) = watch::channel(None);
        Self {
            market,
            aggregator,
            interval: DEFAULT_POLL_INTERVAL,
            resolution: DEFAULT_RESOLUTION.to_string(),
            range_days: HISTORY_DAYS,
            subscription,
            generation: 0,
            cadence: None,
            events: None,
        }
    }

    /// Sets the time between ticks. Applies from the next start.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the candle resolution and range loaded on a symbol switch.
    #[must_use]
    pub fn with_history(mut self, resolution: &str, range_days: u32) -> Self {
        self.resolution = resolution.to_string();
        self.range_days = range_days;
        self
    }

    /// Reports every tick outcome on `events`.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` while a cadence is scheduled.
    pub fn is_running(&self) -> bool {
        self.cadence.as_ref().is_some_and(|c| !c.is_finished())
    }

    /// Returns the symbol of the running cadence.
    pub fn active_symbol(&self) -> Option<String> {
        self.subscription
            .borrow()
            .as_ref()
            .map(|s| s.symbol.clone())
    }

    /// Starts polling `symbol`. The first tick fires one interval from now.
    ///
    /// A cadence for another symbol is stopped first. Starting the symbol
    /// that is already being polled does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, symbol: &str) {
        if self.is_running() && self.active_symbol().as_deref() == Some(symbol) {
            debug!(symbol, "Polling already running");
            return;
        }
        self.stop();

        self.generation += 1;
        let subscription = Subscription {
            symbol: symbol.to_string(),
            generation: self.generation,
        };
        self.subscription.send_replace(Some(subscription.clone()));

        let tick = Tick {
            market: Arc::clone(&self.market),
            aggregator: Arc::clone(&self.aggregator),
            current: self.subscription.subscribe(),
            events: self.events.clone(),
            subscription,
            sequence: 0,
            last_merged: Arc::new(AtomicU64::new(0)),
        };
        self.cadence = Some(spawn_cadence(tick, self.interval));
        info!(symbol, interval_ms = self.interval.as_millis() as u64, "Polling started");
    }

    /// Cancels all pending and future ticks. Idempotent.
    ///
    /// A fetch already in flight completes but its quote is discarded.
    pub fn stop(&mut self) {
        let previous = self.subscription.send_replace(None);
        if let Some(cadence) = self.cadence.take() {
            cadence.abort();
        }
        if let Some(previous) = previous {
            info!(symbol = %previous.symbol, "Polling stopped");
        }
    }

    /// Switches the active symbol.
    ///
    /// Stops the current cadence, reloads the aggregator with candles for
    /// `symbol`, then starts polling it.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidSeries`](crate::DeskError::InvalidSeries)
    /// if the source returns candles out of order. Polling stays stopped and
    /// the previous series is kept.
    pub async fn switch_symbol(&mut self, symbol: &str) -> crate::Result<()> {
        self.stop();

        let candles = self
            .market
            .fetch_candles(symbol, &self.resolution, self.range_days)
            .await;
        self.aggregator.lock().await.load(candles)?;

        self.start(symbol);
        Ok(())
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.subscription.send_replace(None);
        if let Some(cadence) = self.cadence.take() {
            cadence.abort();
        }
    }
}

/// Everything one tick needs, cloned into each spawned fetch.
#[derive(Clone)]
struct Tick {
    market: Arc<dyn MarketData>,
    aggregator: SharedAggregator,
    current: watch::Receiver<Option<Subscription>>,
    events: Option<mpsc::UnboundedSender<PollEvent>>,
    subscription: Subscription,
    /// Position of this tick in its cadence, starting at 1.
    sequence: u64,
    /// Sequence of the newest merged tick. Only touched under the aggregator lock.
    last_merged: Arc<AtomicU64>,
}

impl Tick {
    fn is_current(&self) -> bool {
        self.current.borrow().as_ref() == Some(&self.subscription)
    }

    fn emit(&self, event: PollEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn symbol(&self) -> String {
        self.subscription.symbol.clone()
    }

    async fn run(self) {
        let symbol = self.subscription.symbol.as_str();

        let quote = match AssertUnwindSafe(self.market.fetch_quote(symbol))
            .catch_unwind()
            .await
        {
            Ok(quote) => quote,
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                warn!(symbol, %error, "Quote tick failed");
                self.emit(PollEvent::Failed {
                    symbol: self.symbol(),
                    error,
                });
                return;
            }
        };

        let mut aggregator = self.aggregator.lock().await;
        if !self.is_current() {
            debug!(symbol, "Discarding quote for inactive symbol");
            self.emit(PollEvent::Discarded {
                symbol: self.symbol(),
            });
            return;
        }
        if self.sequence <= self.last_merged.load(Ordering::Relaxed) {
            debug!(symbol, sequence = self.sequence, "Discarding stale quote");
            self.emit(PollEvent::Discarded {
                symbol: self.symbol(),
            });
            return;
        }

        if aggregator.merge_tick(&quote) {
            self.last_merged.store(self.sequence, Ordering::Relaxed);
            debug!(symbol, price = quote.current, "Merged quote");
            self.emit(PollEvent::Merged {
                symbol: self.symbol(),
                close: quote.current,
            });
        } else {
            self.emit(PollEvent::Skipped {
                symbol: self.symbol(),
            });
        }
    }
}

fn spawn_cadence(mut tick: Tick, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if !tick.is_current() {
                break;
            }
            if tick.aggregator.lock().await.is_empty() {
                debug!(symbol = %tick.subscription.symbol, "No series loaded, skipping tick");
                tick.emit(PollEvent::Skipped {
                    symbol: tick.symbol(),
                });
                continue;
            }
            tick.sequence += 1;
            tokio::spawn(tick.clone().run());
        }
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "quote fetch panicked".to_string()
    }
}
