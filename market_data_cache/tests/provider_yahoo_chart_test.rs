#![cfg(test)]
use chrono::{Duration, Utc};
use market_data_cache::{
    models::window::FetchWindow,
    providers::{MarketDataProvider, yahoo_chart::YahooChartProvider},
};
use serial_test::serial;

#[tokio::test]
#[serial]
#[ignore]
async fn test_yahoo_chart_provider_fetch_daily() {
    // This test talks to the live chart endpoint. Run with --ignored.
    let provider = YahooChartProvider::new().expect("Failed to create YahooChartProvider");

    let end = Utc::now().date_naive() - Duration::days(1);
    let start = end - Duration::days(30);
    let window = FetchWindow::dated(start, end).unwrap();

    let result = provider.fetch_daily("AAPL", window).await;

    assert!(result.is_ok(), "fetch_daily returned an error: {:?}", result.err());

    let series = result.unwrap();
    assert_eq!(series.symbol, "AAPL");
    assert!(!series.is_empty(), "Expected at least one bar for AAPL");

    // Bars come back sorted ascending and within the requested window.
    let bars = series.bars();
    if bars.len() > 1 {
        assert!(bars[0].date < bars[bars.len() - 1].date);
    }
    assert!(bars.iter().all(|b| b.date >= start && b.date <= end));
    assert!(bars.iter().all(|b| b.close > 0.0));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_yahoo_chart_provider_dead_symbol_is_empty() {
    let provider = YahooChartProvider::new().expect("Failed to create YahooChartProvider");

    let series = provider
        .fetch_daily("THISISNOTAREALTICKER123", FetchWindow::FullHistory)
        .await
        .expect("dead symbols should come back empty, not as errors");

    assert!(series.is_empty());
}
