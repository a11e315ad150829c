//! Shared test utilities.
//!
//! [`FakeServer`] is a minimal HTTP/1.1 responder on a loopback port. It
//! answers every request with the same canned status and body and records
//! what it received. [`FakeServer::silent`] accepts connections and never
//! answers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const QUOTE_JSON: &str = include_str!("../fixtures/quote.json");
pub const CANDLES_JSON: &str = include_str!("../fixtures/candles.json");
pub const CANDLES_NO_DATA_JSON: &str = include_str!("../fixtures/candles_no_data.json");
pub const CANDLES_UNSORTED_JSON: &str = include_str!("../fixtures/candles_unsorted.json");
pub const TRADES_JSON: &str = include_str!("../fixtures/trades.json");

/// Loopback address nothing listens on.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request line, e.g. `GET /quote?symbol=AAPL&token=k HTTP/1.1`.
    pub line: String,
    pub body: String,
}

/// Canned-response HTTP server.
pub struct FakeServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeServer {
    /// Starts a server answering every request with `status` and `body`.
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&requests);
        let body = body.to_string();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = Arc::clone(&captured);
                let body = body.clone();
                tokio::spawn(async move {
                    let _ = respond(stream, status, &body, &captured).await;
                });
            }
        });

        Self {
            url: format!("http://{addr}"),
            requests,
        }
    }

    /// Starts a server that accepts connections but never writes a response.
    pub async fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake server");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        Self {
            url: format!("http://{addr}"),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

async fn respond(
    stream: TcpStream,
    status: u16,
    body: &str,
    captured: &Mutex<Vec<Request>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        if header.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut payload = vec![0; content_length];
    reader.read_exact(&mut payload).await?;

    captured
        .lock()
        .expect("request log poisoned")
        .push(Request {
            line: line.trim_end().to_string(),
            body: String::from_utf8_lossy(&payload).into_owned(),
        });

    let reason = if status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
