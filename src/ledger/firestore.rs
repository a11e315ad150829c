//! Durable trade store on Firestore, over its REST API.
//!
//! Trades are documents in the `trades` collection. Each document is created
//! with the trade id as its document id, and history is read back with a
//! structured query ordered by `timestamp`, newest first.
//!
//! Every failure, including transport errors, is reported as
//! [`DeskError::Persistence`].

use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::LedgerStore;
use crate::DeskError;
use crate::config::REQUEST_TIMEOUT;
use crate::models::{Side, Trade, TradeStatus};

/// Collection holding the trade documents.
pub const COLLECTION: &str = "trades";

const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// The subset of the Firebase web config the store needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    pub api_key: String,
    pub project_id: String,
    /// Overrides the Firestore REST endpoint (emulators, tests).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl FirestoreConfig {
    /// Parses a Firebase config JSON blob.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Json`] if the blob is not valid JSON with the
    /// required keys, and [`DeskError::Config`] if the project id is blank.
    pub fn parse(blob: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(blob)?;
        if config.project_id.trim().is_empty() {
            return Err(DeskError::Config("Firebase projectId is empty".into()));
        }
        Ok(config)
    }
}

/// Typed Firestore field value.
///
/// Serializes to Firestore's `{"<type>Value": ...}` shape. Integers are
/// carried as strings, as the REST API does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "timestampValue")]
    Timestamp(String),
    #[serde(rename = "nullValue")]
    Null,
}

/// A Firestore document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// Full resource name; the last path segment is the document id.
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<Document>,
}

/// Trade store on a Firestore project.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    documents_url: String,
    api_key: String,
    timeout: Duration,
}

impl FirestoreStore {
    /// Creates a store for the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Http`] if the HTTP client cannot be built.
    pub fn new(config: FirestoreConfig) -> crate::Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/')
            .to_string();
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            documents_url: format!(
                "{endpoint}/projects/{}/databases/(default)/documents",
                config.project_id
            ),
            api_key: config.api_key,
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LedgerStore for FirestoreStore {
    async fn load(&self) -> crate::Result<Vec<Trade>> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }]
            }
        });

        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(persistence)?;

        let results: Vec<QueryResult> = response
            .error_for_status()
            .map_err(persistence)?
            .json()
            .await
            .map_err(persistence)?;

        let trades = results
            .into_iter()
            .filter_map(|r| r.document)
            .map(decode_trade)
            .collect::<crate::Result<Vec<_>>>()?;

        debug!(trades = trades.len(), "Loaded trades from Firestore");
        Ok(trades)
    }

    async fn append(&self, trade: &Trade) -> crate::Result<()> {
        let body = json!({ "fields": encode_trade(trade) });

        let response = self
            .http
            .post(format!("{}/{COLLECTION}", self.documents_url))
            .query(&[("documentId", trade.id.as_str()), ("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(persistence)?;

        response.error_for_status().map_err(persistence)?;
        debug!(id = %trade.id, "Stored trade in Firestore");
        Ok(())
    }
}

/// Encodes a trade as Firestore document fields.
pub fn encode_trade(trade: &Trade) -> HashMap<String, FieldValue> {
    HashMap::from([
        ("id".to_string(), FieldValue::String(trade.id.clone())),
        ("symbol".to_string(), FieldValue::String(trade.symbol.clone())),
        (
            "side".to_string(),
            FieldValue::String(trade.side.as_str().to_string()),
        ),
        (
            "price".to_string(),
            FieldValue::String(trade.price.to_string()),
        ),
        (
            "quantity".to_string(),
            FieldValue::Integer(trade.quantity.to_string()),
        ),
        (
            "timestamp".to_string(),
            FieldValue::Integer(trade.timestamp.to_string()),
        ),
        (
            "status".to_string(),
            FieldValue::String(trade.status.as_str().to_string()),
        ),
    ])
}

/// Decodes a trade document. The document id wins over any `id` field.
pub fn decode_trade(document: Document) -> crate::Result<Trade> {
    let id = document
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed(&document.name, "name"))?
        .to_string();
    let fields = &document.fields;
    let name = document.name.as_str();

    let side = match string_field(fields, "side").ok_or_else(|| malformed(name, "side"))? {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        _ => return Err(malformed(name, "side")),
    };
    let status = match string_field(fields, "status").unwrap_or("FILLED") {
        "FILLED" => TradeStatus::Filled,
        "PENDING" => TradeStatus::Pending,
        _ => return Err(malformed(name, "status")),
    };

    Ok(Trade {
        symbol: string_field(fields, "symbol")
            .ok_or_else(|| malformed(name, "symbol"))?
            .to_string(),
        side,
        price: decimal_field(fields, "price").ok_or_else(|| malformed(name, "price"))?,
        quantity: integer_field(fields, "quantity")
            .and_then(|q| u64::try_from(q).ok())
            .ok_or_else(|| malformed(name, "quantity"))?,
        timestamp: millis_field(fields, "timestamp")
            .ok_or_else(|| malformed(name, "timestamp"))?,
        status,
        id,
    })
}

fn string_field<'a>(fields: &'a HashMap<String, FieldValue>, key: &str) -> Option<&'a str> {
    match fields.get(key)? {
        FieldValue::String(s) => Some(s),
        _ => None,
    }
}

fn integer_field(fields: &HashMap<String, FieldValue>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        FieldValue::Integer(s) => s.parse().ok(),
        FieldValue::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        _ => None,
    }
}

/// Reads a decimal written as an exact string, or as a number by older
/// clients.
fn decimal_field(fields: &HashMap<String, FieldValue>, key: &str) -> Option<Decimal> {
    match fields.get(key)? {
        FieldValue::String(s) | FieldValue::Integer(s) => s.parse().ok(),
        FieldValue::Double(d) => Decimal::try_from(*d).ok(),
        _ => None,
    }
}

/// Reads an instant as unix milliseconds from an integer or timestamp field.
fn millis_field(fields: &HashMap<String, FieldValue>, key: &str) -> Option<u64> {
    match fields.get(key)? {
        FieldValue::Timestamp(ts) => DateTime::parse_from_rfc3339(ts)
            .ok()
            .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok()),
        _ => integer_field(fields, key).and_then(|ms| u64::try_from(ms).ok()),
    }
}

fn malformed(document: &str, field: &str) -> DeskError {
    DeskError::Persistence(format!("document {document} has a missing or invalid {field}"))
}

fn persistence(e: impl Display) -> DeskError {
    DeskError::Persistence(format!("firestore: {e}"))
}
