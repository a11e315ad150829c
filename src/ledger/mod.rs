//! Append-only trade ledger.
//!
//! [`TradeLedger`] records executed trades in one of two backing stores:
//! - [`firestore`] - a durable Firestore collection, when configured
//! - [`local`] - a JSON file on this machine otherwise
//!
//! The store is chosen once when the ledger is opened. A failing durable
//! store is reported to the caller; the ledger never switches to the local
//! file mid-session, which would split the history across two stores.

pub mod firestore;
pub mod local;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::models::{OrderRequest, Trade};

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use local::LocalStore;

/// Last trade timestamp handed out, in unix milliseconds.
static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// A backing store for trades.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns every stored trade, in no particular order.
    async fn load(&self) -> crate::Result<Vec<Trade>>;

    /// Persists a finalized trade.
    async fn append(&self, trade: &Trade) -> crate::Result<()>;
}

/// Which kind of store backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Durable,
    Local,
}

impl LedgerBackend {
    /// Returns a short status label for display.
    pub fn label(&self) -> &'static str {
        match self {
            LedgerBackend::Durable => "Firebase",
            LedgerBackend::Local => "Local Mock",
        }
    }
}

impl fmt::Display for LedgerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trade history over a single backing store.
pub struct TradeLedger {
    store: Box<dyn LedgerStore>,
    backend: LedgerBackend,
    write_lock: Mutex<()>,
}

impl TradeLedger {
    /// Opens the ledger selected by `config`.
    ///
    /// A present but unusable store configuration selects the local store
    /// with a warning. This is the only point where that choice is made.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Http`](crate::DeskError::Http) if the HTTP client
    /// for the durable store cannot be built.
    pub fn open(config: &LedgerConfig) -> crate::Result<Self> {
        let Some(blob) = config.store_config.as_deref() else {
            warn!(
                dir = %config.local_dir.display(),
                "No ledger store configured, recording trades locally"
            );
            return Ok(Self::local(LocalStore::new(&config.local_dir)));
        };

        match FirestoreConfig::parse(blob) {
            Ok(store_config) => {
                info!(project = %store_config.project_id, "Recording trades in Firestore");
                Ok(Self::durable(FirestoreStore::new(store_config)?))
            }
            Err(e) => {
                warn!(error = %e, "Ledger store configuration unusable, recording trades locally");
                Ok(Self::local(LocalStore::new(&config.local_dir)))
            }
        }
    }

    /// Creates a ledger over the local file store.
    #[must_use]
    pub fn local(store: LocalStore) -> Self {
        Self::with_store(Box::new(store), LedgerBackend::Local)
    }

    /// Creates a ledger over the durable store.
    #[must_use]
    pub fn durable(store: FirestoreStore) -> Self {
        Self::with_store(Box::new(store), LedgerBackend::Durable)
    }

    /// Creates a ledger over any store.
    #[must_use]
    pub fn with_store(store: Box<dyn LedgerStore>, backend: LedgerBackend) -> Self {
        Self {
            store,
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> LedgerBackend {
        self.backend
    }

    /// Returns all trades, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Persistence`](crate::DeskError::Persistence) if
    /// the store cannot be read.
    pub async fn read(&self) -> crate::Result<Vec<Trade>> {
        let mut trades = self.store.load().await?;
        trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(trades)
    }

    /// Records `order` as a filled trade and returns it.
    ///
    /// Writes are serialized, so concurrent callers never observe or
    /// produce colliding ids.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidOrder`](crate::DeskError::InvalidOrder)
    /// for a malformed candidate and
    /// [`DeskError::Persistence`](crate::DeskError::Persistence) if the
    /// store rejects the write.
    pub async fn write(&self, order: OrderRequest) -> crate::Result<Trade> {
        order.validate()?;

        let _guard = self.write_lock.lock().await;
        let timestamp = next_timestamp();
        let trade = order.fill(trade_id(timestamp), timestamp);

        if let Err(e) = self.store.append(&trade).await {
            warn!(id = %trade.id, backend = %self.backend, error = %e, "Trade write failed");
            return Err(e);
        }

        info!(
            id = %trade.id,
            symbol = %trade.symbol,
            side = trade.side.as_str(),
            price = %trade.price,
            quantity = trade.quantity,
            "Trade recorded"
        );
        Ok(trade)
    }
}

/// Returns the current time in unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Returns a strictly increasing trade timestamp in unix milliseconds.
///
/// Follows the wall clock, but a call landing in the same millisecond as the
/// previous one (or after the clock stepped back) gets the previous value
/// plus one.
fn next_timestamp() -> u64 {
    let now = now_millis();

    let mut prev = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let ts = now.max(prev + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(prev, ts, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return ts,
            Err(actual) => prev = actual,
        }
    }
}

/// Builds a trade id from its timestamp and a random suffix.
///
/// The timestamp is unique within the process; the suffix keeps ids from
/// separate processes writing to the same store apart.
fn trade_id(timestamp: u64) -> String {
    format!("trade_{timestamp}_{:08x}", rand::random::<u32>())
}
