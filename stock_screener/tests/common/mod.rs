#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use market_data_cache::{
    DailyBar, FetchWindow, MarketDataProvider, ProviderError, RetryingFetcher, RosterEntry,
    RosterProvider, RosterStore, Series, SeriesStore,
    fetcher::retry::RetryPolicy,
    providers::ApiSnafu,
};
use stock_screener::{Orchestrator, WorkPool};
use tempfile::TempDir;

pub const HOUR: Duration = Duration::from_secs(3600);

/// 34 bars: equal tops at 120 and 119 with a deep valley between them.
pub const DOUBLE_TOP: [f64; 34] = [
    100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 112.0, 114.0, 116.0, 118.0, 120.0, 118.0, 115.0,
    112.0, 109.0, 107.0, 105.0, 107.0, 109.0, 111.0, 113.0, 115.0, 117.0, 119.0, 117.0, 114.0,
    111.0, 108.0, 105.0, 102.0, 100.0, 98.0, 96.0, 94.0,
];

pub fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// One bar per calendar day starting at `start`, closing at `closes`.
pub fn daily_bars(start: NaiveDate, closes: &[f64]) -> Vec<DailyBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyBar {
            date: start + Days::new(i as u64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        })
        .collect()
}

/// In-memory market data source keyed by symbol, with optional per-symbol
/// failures and a call counter.
pub struct FixtureProvider {
    bars: HashMap<String, Vec<DailyBar>>,
    failing: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            failing: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_series(mut self, symbol: &str, start: &str, closes: &[f64]) -> Self {
        self.bars.insert(symbol.to_string(), daily_bars(d(start), closes));
        self
    }

    pub fn with_failing(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    /// Handle onto the call counter, usable after the provider moves into
    /// a fetcher.
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MarketDataProvider for FixtureProvider {
    async fn fetch_daily(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| s == symbol) {
            return ApiSnafu {
                message: format!("fixture failure for {symbol}"),
            }
            .fail();
        }
        let bars = self.bars.get(symbol).cloned().unwrap_or_default();
        let bars = match window {
            FetchWindow::Dated { start, end } => bars
                .into_iter()
                .filter(|b| b.date >= start && b.date <= end)
                .collect(),
            FetchWindow::FullHistory => bars,
        };
        Ok(Series::from_bars(symbol, bars))
    }
}

/// Roster source serving a fixed entry list.
pub struct FixtureRoster(pub Vec<RosterEntry>);

#[async_trait]
impl RosterProvider for FixtureRoster {
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, ProviderError> {
        Ok(self.0.clone())
    }
}

pub fn roster_of(pairs: &[(&str, &str)]) -> FixtureRoster {
    FixtureRoster(
        pairs
            .iter()
            .map(|(symbol, name)| RosterEntry {
                symbol: symbol.to_string(),
                name: name.to_string(),
            })
            .collect(),
    )
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        factor: 2.0,
        max_delay: Duration::from_millis(5),
    }
}

/// Orchestrator over stores rooted in `dir`, so a second orchestrator on
/// the same directory sees whatever the first one cached.
pub async fn orchestrator_in(
    dir: &TempDir,
    provider: FixtureProvider,
    offline: bool,
) -> Orchestrator<FixtureProvider> {
    let series_store = SeriesStore::open(dir.path(), HOUR).await.unwrap();
    let roster_store = RosterStore::open(dir.path(), HOUR).await.unwrap();
    let fetcher = RetryingFetcher::new(provider, series_store, fast_policy());
    Orchestrator::new(fetcher, roster_store, WorkPool::new(4)).offline(offline)
}
