//! Portfolio valuation tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use quantdesk::models::{Side, Trade, TradeStatus};
use quantdesk::portfolio::{CHART_COLORS, valuate};

fn trade(symbol: &str, price: Decimal, quantity: u64) -> Trade {
    Trade {
        id: format!("trade_{symbol}_{quantity}"),
        symbol: symbol.to_string(),
        side: Side::Buy,
        price,
        quantity,
        timestamp: 1_700_000_000_000,
        status: TradeStatus::Filled,
    }
}

#[test]
fn test_even_split_scenario() {
    let trades = [trade("AAPL", dec!(100), 10), trade("TSLA", dec!(50), 20)];
    let portfolio = valuate(&trades);

    assert_eq!(portfolio.holdings.len(), 2);
    let aapl = portfolio.holding("AAPL").unwrap();
    assert_eq!(aapl.value, dec!(1000));
    assert_eq!(aapl.percentage, dec!(50.0));
    let tsla = portfolio.holding("TSLA").unwrap();
    assert_eq!(tsla.value, dec!(1000));
    assert_eq!(tsla.percentage, dec!(50.0));
    assert_eq!(portfolio.total_value, dec!(2000));
}

#[test]
fn test_empty_ledger() {
    let portfolio = valuate(&[]);

    assert!(portfolio.is_empty());
    assert!(portfolio.holdings.is_empty());
    assert_eq!(portfolio.total_value, Decimal::ZERO);
}

#[test]
fn test_single_symbol_is_whole_portfolio() {
    let trades = [
        trade("NVDA", dec!(400), 10),
        trade("NVDA", dec!(450), 2),
        trade("NVDA", dec!(410.5), 1),
    ];
    let portfolio = valuate(&trades);

    assert_eq!(portfolio.holdings.len(), 1);
    assert_eq!(portfolio.holdings[0].percentage, dec!(100.0));
}

#[test]
fn test_value_is_conserved() {
    let trades = [
        trade("AAPL", dec!(152.45), 3),
        trade("TSLA", dec!(210.50), 7),
        trade("AAPL", dec!(145), 50),
        trade("NVDA", dec!(400), 10),
        trade("MSFT", dec!(0.01), 1),
    ];
    let portfolio = valuate(&trades);

    let trade_sum: Decimal = trades.iter().map(Trade::value).sum();
    let holding_sum: Decimal = portfolio.holdings.iter().map(|h| h.value).sum();
    assert_eq!(holding_sum, trade_sum);
    assert_eq!(portfolio.total_value, trade_sum);

    let pct_sum: Decimal = portfolio.holdings.iter().map(|h| h.percentage).sum();
    let drift = (pct_sum - dec!(100)).abs();
    assert!(drift <= dec!(0.05) * Decimal::from(portfolio.holdings.len()));
}

#[test]
fn test_holdings_follow_first_appearance() {
    let trades = [
        trade("TSLA", dec!(1), 1),
        trade("AAPL", dec!(1), 1),
        trade("TSLA", dec!(1), 1),
        trade("NVDA", dec!(1), 1),
    ];
    let portfolio = valuate(&trades);

    let symbols: Vec<_> = portfolio.holdings.iter().map(|h| h.symbol.as_str()).collect();
    assert_eq!(symbols, ["TSLA", "AAPL", "NVDA"]);
    let colors: Vec<_> = portfolio.holdings.iter().map(|h| h.color).collect();
    assert_eq!(colors, CHART_COLORS[..3]);
}

#[test]
fn test_valuation_is_deterministic() {
    let trades = [trade("AAPL", dec!(152.45), 3), trade("TSLA", dec!(210.5), 7)];

    assert_eq!(valuate(&trades), valuate(&trades));
}
