//! Trade ledger tests against the local store and a fake Firestore.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use quantdesk::DeskError;
use quantdesk::config::LedgerConfig;
use quantdesk::ledger::{FirestoreConfig, FirestoreStore, LedgerBackend, LocalStore, TradeLedger};
use quantdesk::models::{OrderRequest, Side, TradeStatus};

use common::{FakeServer, UNREACHABLE_URL};

const RUN_QUERY_JSON: &str = r#"[
  {
    "document": {
      "name": "projects/demo/databases/(default)/documents/trades/trade_1700000300000_0000beef",
      "fields": {
        "symbol": { "stringValue": "TSLA" },
        "side": { "stringValue": "BUY" },
        "price": { "doubleValue": 210.5 },
        "quantity": { "integerValue": "7" },
        "timestamp": { "integerValue": "1700000300000" },
        "status": { "stringValue": "FILLED" }
      }
    },
    "readTime": "2023-11-14T22:20:00Z"
  },
  {
    "document": {
      "name": "projects/demo/databases/(default)/documents/trades/trade_1700000000000_0000cafe",
      "fields": {
        "symbol": { "stringValue": "AAPL" },
        "side": { "stringValue": "BUY" },
        "price": { "doubleValue": 152.45 },
        "quantity": { "integerValue": "3" },
        "timestamp": { "integerValue": "1700000000000" },
        "status": { "stringValue": "FILLED" }
      }
    },
    "readTime": "2023-11-14T22:20:00Z"
  }
]"#;

fn local_ledger(dir: &std::path::Path) -> TradeLedger {
    TradeLedger::local(LocalStore::new(dir).without_latency())
}

fn firestore_ledger(endpoint: &str) -> TradeLedger {
    let config = FirestoreConfig {
        api_key: "test-key".into(),
        project_id: "demo".into(),
        endpoint: Some(endpoint.into()),
    };
    TradeLedger::durable(FirestoreStore::new(config).expect("Failed to build store"))
}

#[tokio::test]
async fn test_fresh_local_ledger_serves_seed_trades() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = local_ledger(dir.path());

    let trades = ledger.read().await.unwrap();

    let symbols: Vec<_> = trades.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, ["TSLA", "AAPL", "NVDA"]);
    assert!(trades.iter().all(|t| t.status == TradeStatus::Filled));
}

#[tokio::test]
async fn test_write_then_read_returns_trade_first() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = local_ledger(dir.path());

    let trade = assert_ok!(ledger.write(OrderRequest::buy("aapl", dec!(152.45), 3)).await);
    assert_eq!(trade.symbol, "AAPL");
    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.status, TradeStatus::Filled);

    let trades = ledger.read().await.unwrap();
    assert_eq!(trades[0], trade);
    assert_eq!(trades.iter().filter(|t| t.id == trade.id).count(), 1);
}

#[tokio::test]
async fn test_rapid_writes_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = local_ledger(dir.path());

    let first = ledger
        .write(OrderRequest::buy("AAPL", dec!(1), 1))
        .await
        .unwrap();
    let second = ledger
        .write(OrderRequest::buy("AAPL", dec!(1), 1))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(second.timestamp > first.timestamp);
}

#[tokio::test]
async fn test_concurrent_writes_never_collide() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(local_ledger(dir.path()));

    let handles: Vec<_> = (1..=10)
        .map(|quantity| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .write(OrderRequest::buy("TSLA", dec!(210.5), quantity))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let trade = handle.await.unwrap().unwrap();
        assert!(ids.insert(trade.id));
    }

    let trades = ledger.read().await.unwrap();
    assert_eq!(trades.len(), 13);
}

#[tokio::test]
async fn test_local_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        store_config: None,
        local_dir: dir.path().to_path_buf(),
    };

    let trade = {
        let ledger = local_ledger(dir.path());
        ledger
            .write(OrderRequest::buy("NVDA", dec!(450), 2))
            .await
            .unwrap()
    };

    let reopened = TradeLedger::open(&config).unwrap();
    assert_eq!(reopened.backend(), LedgerBackend::Local);
    let trades = reopened.read().await.unwrap();
    assert_eq!(trades[0], trade);
    assert_eq!(trades.len(), 4);
}

#[tokio::test]
async fn test_invalid_order_is_rejected_before_store() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = local_ledger(dir.path());

    let err = ledger
        .write(OrderRequest::buy("AAPL", dec!(152.45), 0))
        .await
        .unwrap_err();

    assert!(matches!(err, DeskError::InvalidOrder(_)));
    assert!(!dir.path().join("mock_trades.json").exists());
}

#[tokio::test]
async fn test_overflowing_order_is_rejected_before_store() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = local_ledger(dir.path());

    let err = assert_err!(
        ledger
            .write(OrderRequest::buy("AAPL", dec!(10000000000), u64::MAX))
            .await
    );

    assert!(matches!(err, DeskError::InvalidOrder(_)));
    assert!(!dir.path().join("mock_trades.json").exists());
    assert_eq!(ledger.read().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_durable_store_fails_without_local_write() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        store_config: Some(format!(
            r#"{{"apiKey":"k","projectId":"demo","endpoint":"{UNREACHABLE_URL}"}}"#
        )),
        local_dir: dir.path().to_path_buf(),
    };
    let ledger = TradeLedger::open(&config).unwrap();
    assert_eq!(ledger.backend(), LedgerBackend::Durable);

    let err = assert_err!(ledger.write(OrderRequest::buy("AAPL", dec!(152.45), 1)).await);
    assert!(matches!(err, DeskError::Persistence(_)));

    let err = assert_err!(ledger.read().await);
    assert!(matches!(err, DeskError::Persistence(_)));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_durable_write_creates_document_with_trade_id() {
    let server = FakeServer::start(200, "{}").await;
    let ledger = firestore_ledger(&server.url);

    let trade = ledger
        .write(OrderRequest::buy("AAPL", dec!(152.45), 3))
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.line.starts_with(
        "POST /projects/demo/databases/(default)/documents/trades?documentId="
    ));
    assert!(request.line.contains(&trade.id));
    assert!(request.line.contains("key=test-key"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["fields"]["symbol"]["stringValue"], "AAPL");
    assert_eq!(body["fields"]["quantity"]["integerValue"], "3");
    assert_eq!(body["fields"]["price"]["stringValue"], "152.45");
}

#[tokio::test]
async fn test_durable_read_decodes_query_results() {
    let server = FakeServer::start(200, RUN_QUERY_JSON).await;
    let ledger = firestore_ledger(&server.url);

    let trades = ledger.read().await.unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].id, "trade_1700000300000_0000beef");
    assert_eq!(trades[0].price, dec!(210.5));
    assert_eq!(trades[1].symbol, "AAPL");
    assert_eq!(trades[1].quantity, 3);

    let requests = server.requests();
    assert!(requests[0].line.starts_with("POST /projects/demo/databases/(default)/documents:runQuery"));
    let query: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        query["structuredQuery"]["orderBy"][0]["direction"],
        "DESCENDING"
    );
}

#[tokio::test]
async fn test_stalled_durable_store_times_out() {
    let server = FakeServer::silent().await;
    let config = FirestoreConfig {
        api_key: "test-key".into(),
        project_id: "demo".into(),
        endpoint: Some(server.url.clone()),
    };
    let store = FirestoreStore::new(config)
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    let ledger = TradeLedger::durable(store);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ledger.write(OrderRequest::buy("AAPL", dec!(152.45), 1)),
    )
    .await
    .expect("write was not bounded by the store timeout");

    let err = assert_err!(result);
    assert!(matches!(err, DeskError::Persistence(_)));
}

#[tokio::test]
async fn test_durable_error_status_is_persistence_error() {
    let server = FakeServer::start(403, r#"{"error":{"code":403}}"#).await;
    let ledger = firestore_ledger(&server.url);

    let err = ledger
        .write(OrderRequest::buy("AAPL", dec!(152.45), 1))
        .await
        .unwrap_err();

    assert!(matches!(err, DeskError::Persistence(_)));
}
