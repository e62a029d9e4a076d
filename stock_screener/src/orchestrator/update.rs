//! Bulk refresh of the full-history cache.

use std::sync::Arc;

use chrono::NaiveDate;
use market_data_cache::{MarketDataProvider, RosterProvider};
use snafu::{ResultExt, ensure};

use crate::output::UpdateSummary;

use super::{FetchSnafu, NotReadySnafu, OfflineRefreshSnafu, Orchestrator, ScreenerError};

impl<P: MarketDataProvider + 'static> Orchestrator<P> {
    /// Brings every roster symbol's full-history entry up to `today`,
    /// appending incrementally where an entry already exists.
    ///
    /// The whole run is declined when the source has no close for `today`
    /// yet, probed on one liquid symbol; refreshing before the close would
    /// stamp every entry with yesterday's data as today's. Past the probe,
    /// a failing symbol is counted and skipped, never fatal.
    pub async fn refresh_universe<R: RosterProvider>(
        &self,
        listing: Option<&R>,
        probe_symbol: &str,
        today: NaiveDate,
    ) -> Result<UpdateSummary, ScreenerError> {
        ensure!(!self.offline, OfflineRefreshSnafu);

        let ready = self
            .fetcher
            .has_todays_close(probe_symbol, today)
            .await
            .context(FetchSnafu)?;
        ensure!(ready, NotReadySnafu { date: today });

        let roster = self.roster(listing).await?;
        tracing::info!(symbols = roster.len(), %today, "starting bulk refresh");

        let symbols: Vec<String> = roster.symbols().map(str::to_string).collect();
        let total = symbols.len();
        let fetcher = Arc::clone(&self.fetcher);
        let updated = self
            .pool
            .run(symbols, move |symbol| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    match fetcher.refresh_full(&symbol, today).await {
                        Ok(series) => {
                            tracing::debug!(symbol, bars = series.len(), "refreshed");
                            Some(())
                        }
                        Err(err) => {
                            tracing::warn!(symbol, error = %err, "refresh failed");
                            None
                        }
                    }
                }
            })
            .await
            .len();

        let summary = UpdateSummary {
            updated,
            failed: total - updated,
        };
        tracing::info!(
            updated = summary.updated,
            failed = summary.failed,
            "bulk refresh finished"
        );
        Ok(summary)
    }
}
