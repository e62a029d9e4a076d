//! Wiring of fetcher, work pool and analysis engines into the
//! user-facing operations.
//!
//! Every operation follows the same shape: obtain the roster, fan the
//! universe out through the pool (each worker pulling its series
//! through the cache), run the pure analysis, then sort and truncate
//! deterministically. One symbol's failure is logged and skipped; only
//! a missing roster or an unusable base symbol aborts a whole run.

mod scan;
mod similar;
mod update;

use std::sync::Arc;

use chrono::NaiveDate;
use snafu::{Backtrace, ResultExt, Snafu, ensure};
use market_data_cache::{
    FetchError, FetchWindow, MarketDataProvider, Roster, RosterProvider, RosterStore,
    RetryingFetcher, Series, StoreError, WindowError, get_roster,
};

use crate::pool::WorkPool;
use crate::render::RenderError;

pub use scan::ScanRequest;
pub use similar::{COMPARE_MIN_OVERLAP, CompareRequest, SimilarRequest};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScreenerError {
    #[snafu(display("Fetch failed: {source}"))]
    Fetch {
        #[snafu(backtrace)]
        source: FetchError,
    },

    #[snafu(display("Cache access failed: {source}"))]
    Store {
        #[snafu(backtrace)]
        source: StoreError,
    },

    #[snafu(display("Invalid date window: {source}"))]
    BadWindow {
        source: WindowError,
        backtrace: Backtrace,
    },

    #[snafu(display("No cached roster and no listing source configured"))]
    NoRoster { backtrace: Backtrace },

    #[snafu(display("No data for {symbol} in the requested window"))]
    NoBaseData {
        symbol: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Base symbol {symbol} has a flat price over the window; nothing to compare"))]
    FlatBase {
        symbol: String,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Too little shared history between the two symbols: {days} overlapping days, need {required}"
    ))]
    ThinOverlap {
        days: usize,
        required: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("No closing data published for {date} yet; refresh declined"))]
    NotReady {
        date: NaiveDate,
        backtrace: Backtrace,
    },

    #[snafu(display("Cannot refresh the cache in offline mode"))]
    OfflineRefresh { backtrace: Backtrace },

    #[snafu(display("Chart rendering failed: {source}"))]
    Render {
        source: RenderError,
        backtrace: Backtrace,
    },
}

/// Entry point for the scan, similarity, compare and refresh
/// operations.
pub struct Orchestrator<P> {
    fetcher: Arc<RetryingFetcher<P>>,
    roster_store: RosterStore,
    pool: WorkPool,
    offline: bool,
}

impl<P: MarketDataProvider + 'static> Orchestrator<P> {
    pub fn new(fetcher: RetryingFetcher<P>, roster_store: RosterStore, pool: WorkPool) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            roster_store,
            pool,
            offline: false,
        }
    }

    /// Serve analysis from cache only, never the network.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn fetcher(&self) -> &RetryingFetcher<P> {
        &self.fetcher
    }

    /// Roster access: refreshed through the listing provider when one is
    /// wired, otherwise whatever an earlier run left in the store.
    pub async fn roster<R: RosterProvider>(
        &self,
        provider: Option<&R>,
    ) -> Result<Roster, ScreenerError> {
        if let Some(provider) = provider {
            if !self.offline {
                return get_roster(provider, &self.roster_store)
                    .await
                    .context(FetchSnafu);
            }
        }
        let cached = self.roster_store.load_any().await.context(StoreSnafu)?;
        match cached {
            Some(roster) if !roster.is_empty() => Ok(roster),
            _ => NoRosterSnafu.fail(),
        }
    }

    /// Pulls one symbol's series through the cache, treating an empty
    /// result as absent data.
    async fn load_one(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, ScreenerError> {
        let series = if self.offline {
            self.fetcher.get_daily_offline(symbol, window).await
        } else {
            self.fetcher.get_daily(symbol, window).await
        }
        .context(FetchSnafu)?;
        ensure!(!series.is_empty(), NoBaseDataSnafu { symbol });
        Ok(series)
    }

    /// Fan-out phase shared by the analysis operations: every roster
    /// symbol's series comes through the cache, and symbols that fail or
    /// have no bars in the window drop out here.
    async fn load_universe(
        &self,
        roster: &Roster,
        window: FetchWindow,
        exclude: Option<&str>,
    ) -> Vec<(String, String, Series)> {
        let jobs: Vec<(String, String)> = roster
            .iter()
            .filter(|(symbol, _)| Some(*symbol) != exclude)
            .map(|(symbol, name)| (symbol.to_string(), name.to_string()))
            .collect();
        let fetcher = Arc::clone(&self.fetcher);
        let offline = self.offline;
        self.pool
            .run(jobs, move |(symbol, name)| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let result = if offline {
                        fetcher.get_daily_offline(&symbol, window).await
                    } else {
                        fetcher.get_daily(&symbol, window).await
                    };
                    match result {
                        Ok(series) if !series.is_empty() => Some((symbol, name, series)),
                        Ok(_) => {
                            tracing::debug!(symbol, "no bars in window");
                            None
                        }
                        Err(err) => {
                            tracing::warn!(symbol, error = %err, "skipping symbol");
                            None
                        }
                    }
                }
            })
            .await
    }
}
