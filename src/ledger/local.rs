//! Local JSON-file trade store.
//!
//! Stands in for the durable store when none is configured. The whole trade
//! list lives in one file named after a fixed collection, rewritten on every
//! append, so it survives restarts on the same machine. Until the first
//! write, reads return a small set of seed trades.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use super::{LedgerStore, now_millis};
use crate::DeskError;
use crate::models::{Side, Trade, TradeStatus};

/// Collection name; the store file is `<dir>/mock_trades.json`.
pub const COLLECTION: &str = "mock_trades";

/// Simulated round trip of a write.
const WRITE_LATENCY: Duration = Duration::from_millis(800);

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Trade store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    write_latency: Duration,
}

impl LocalStore {
    /// Creates a store keeping its file in `dir`. Nothing is touched on disk
    /// until the first append.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{COLLECTION}.json")),
            write_latency: WRITE_LATENCY,
        }
    }

    /// Overrides the simulated write latency.
    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Removes the simulated write latency.
    #[must_use]
    pub fn without_latency(self) -> Self {
        self.with_write_latency(Duration::ZERO)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, trades: &[Trade]) -> crate::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DeskError::Persistence(format!("failed to create {}: {e}", dir.display()))
            })?;
        }

        let json = serde_json::to_vec_pretty(trades)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| DeskError::Persistence(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            DeskError::Persistence(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for LocalStore {
    async fn load(&self) -> crate::Result<Vec<Trade>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No local ledger yet, serving seed trades");
                return Ok(seed_trades(now_millis()));
            }
            Err(e) => {
                return Err(DeskError::Persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            DeskError::Persistence(format!("corrupt ledger {}: {e}", self.path.display()))
        })
    }

    async fn append(&self, trade: &Trade) -> crate::Result<()> {
        let mut trades = self.load().await?;
        trades.insert(0, trade.clone());
        self.save(&trades).await?;

        tokio::time::sleep(self.write_latency).await;
        debug!(id = %trade.id, path = %self.path.display(), "Appended trade locally");
        Ok(())
    }
}

/// Starter positions shown before anything has been recorded.
fn seed_trades(now: u64) -> Vec<Trade> {
    let seed = |id: &str, symbol: &str, price: Decimal, quantity: u64, days_ago: u64| Trade {
        id: id.to_string(),
        symbol: symbol.to_string(),
        side: Side::Buy,
        price,
        quantity,
        timestamp: now.saturating_sub(days_ago * MILLIS_PER_DAY),
        status: TradeStatus::Filled,
    };

    vec![
        seed("t1", "AAPL", Decimal::new(145, 0), 50, 5),
        seed("t2", "TSLA", Decimal::new(190, 0), 20, 3),
        seed("t3", "NVDA", Decimal::new(400, 0), 10, 10),
    ]
}
