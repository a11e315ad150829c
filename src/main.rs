use std::time::Duration;

use quantdesk::DeskError;
use quantdesk::config::fetch_config;
use quantdesk::desk::TradeDesk;
use quantdesk::market::BASELINE_SYMBOL;
use quantdesk::polling::PollEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How often the console summary is printed.
const REPORT_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), DeskError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;
    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| BASELINE_SYMBOL.to_string());

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut desk = TradeDesk::from_config(&app_config)?.with_poll_events(events_tx);
    info!(
        market = %desk.market_mode(),
        ledger = %desk.ledger_backend(),
        "Desk ready"
    );

    desk.select_symbol(&symbol).await?;
    report(&desk).await;

    let mut reports = tokio::time::interval(REPORT_INTERVAL);
    reports.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                PollEvent::Merged { symbol, close } => info!(symbol = %symbol, close, "Tick"),
                PollEvent::Failed { symbol, error } => warn!(symbol = %symbol, error = %error, "Tick failed"),
                PollEvent::Skipped { .. } | PollEvent::Discarded { .. } => {}
            },
            _ = reports.tick() => report(&desk).await,
            _ = &mut shutdown => break,
        }
    }

    desk.stop_polling();
    info!("Shutting down");
    Ok(())
}

async fn report(desk: &TradeDesk) {
    let candles = desk.candles().await;
    if let Some(last) = candles.last() {
        info!(
            symbol = %desk.active_symbol().unwrap_or_default(),
            candles = candles.len(),
            time = %last.time,
            open = last.open,
            high = last.high,
            low = last.low,
            close = last.close,
            "Chart"
        );
    }

    match desk.portfolio().await {
        Ok(portfolio) => {
            for holding in &portfolio.holdings {
                info!(
                    symbol = %holding.symbol,
                    value = %holding.value,
                    percentage = %holding.percentage,
                    "Holding"
                );
            }
            info!(total = %portfolio.total_value, "Portfolio");
        }
        Err(e) => error!(error = %e, "Failed to value portfolio"),
    }
}
