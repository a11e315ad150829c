//! Application configuration loaded from environment variables.
//!
//! Everything is optional; absence selects the local stand-ins:
//! - `FINNHUB_API_KEY` - enables live market data (mock data otherwise)
//! - `FINNHUB_BASE_URL` - overrides the default Finnhub REST endpoint
//! - `MOCK_SEED` - fixes the seed of the mock market generator
//! - `FIREBASE_CONFIG` - Firebase web config JSON; enables the durable ledger
//! - `LEDGER_DIR` - directory of the local ledger file
//!
//! The configuration is resolved once at startup and passed into the
//! market and ledger constructors.

use std::path::PathBuf;
use std::time::Duration;

/// Default Finnhub REST endpoint.
const DEFAULT_FINNHUB_URL: &str = "https://finnhub.io/api/v1";

/// Upper bound on a single market or ledger HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default directory of the local ledger store.
const DEFAULT_LEDGER_DIR: &str = ".quantdesk";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub ledger: LedgerConfig,
}

/// Market-data source configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Seed for the mock generator. `None` draws a fresh seed per process.
    pub mock_seed: Option<u64>,
}

impl MarketConfig {
    /// Returns `true` when a market-data credential is configured.
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FINNHUB_URL.to_string(),
            api_key: None,
            mock_seed: None,
        }
    }
}

/// Trade ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Raw Firebase config blob. Presence selects the durable store.
    pub store_config: Option<String>,
    pub local_dir: PathBuf,
}

impl LedgerConfig {
    /// Returns `true` when a durable store configuration is present.
    pub fn is_durable(&self) -> bool {
        self.store_config.is_some()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_config: None,
            local_dir: PathBuf::from(DEFAULT_LEDGER_DIR),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`DeskError::Config`](crate::DeskError::Config) if `MOCK_SEED`
/// is set but is not an unsigned integer.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let base_url =
        non_empty_var("FINNHUB_BASE_URL").unwrap_or_else(|| DEFAULT_FINNHUB_URL.to_string());
    let api_key = non_empty_var("FINNHUB_API_KEY");

    let mock_seed = match non_empty_var("MOCK_SEED") {
        Some(raw) => Some(raw.parse::<u64>().map_err(|e| {
            crate::DeskError::Config(format!("MOCK_SEED must be an unsigned integer: {e}"))
        })?),
        None => None,
    };

    let store_config = non_empty_var("FIREBASE_CONFIG");
    let local_dir = non_empty_var("LEDGER_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_DIR));

    Ok(AppConfig {
        market: MarketConfig {
            base_url,
            api_key,
            mock_seed,
        },
        ledger: LedgerConfig {
            store_config,
            local_dir,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
