//! Roster-wide pattern scan.

use chart_analysis::{PatternKind, PatternParams, detect, trailing_volatility};
use chrono::NaiveDate;
use market_data_cache::{FetchWindow, MarketDataProvider, RosterProvider};
use snafu::ResultExt;

use crate::output::PatternHit;

use super::{BadWindowSnafu, Orchestrator, ScreenerError};

/// Closes counted toward the activity ranking of a hit.
const VOLATILITY_WINDOW: usize = 60;

/// One pattern scan: which shape, over which dates, how many hits to keep.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub pattern: PatternKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub top_n: usize,
}

impl<P: MarketDataProvider + 'static> Orchestrator<P> {
    /// Tests every roster symbol for `request.pattern` over the window and
    /// keeps the `top_n` most volatile hits.
    ///
    /// Detection runs on whatever bars the window actually contains; a
    /// symbol with too little history simply never matches. Hits are ranked
    /// by the standard deviation of their trailing closes so the quiet
    /// matches fall off the end, with ties broken by symbol for a stable
    /// ordering.
    pub async fn scan_patterns<R: RosterProvider>(
        &self,
        listing: Option<&R>,
        request: &ScanRequest,
        params: &PatternParams,
    ) -> Result<Vec<PatternHit>, ScreenerError> {
        let window =
            FetchWindow::dated(request.start, request.end).context(BadWindowSnafu)?;
        let roster = self.roster(listing).await?;
        tracing::info!(
            pattern = %request.pattern,
            symbols = roster.len(),
            window = %window,
            "starting pattern scan"
        );

        let universe = self.load_universe(&roster, window, None).await;
        tracing::debug!(loaded = universe.len(), "universe loaded, detecting");

        let pattern = request.pattern;
        let params = params.clone();
        let mut ranked: Vec<(f64, PatternHit)> = self
            .pool
            .run_blocking(universe, move |(symbol, name, series)| {
                let closes = series.closes();
                if !detect(&closes, pattern, &params) {
                    return None;
                }
                let (Some(start_date), Some(end_date)) =
                    (series.first_date(), series.last_date())
                else {
                    return None;
                };
                Some((
                    trailing_volatility(&closes, VOLATILITY_WINDOW),
                    PatternHit {
                        symbol,
                        name,
                        pattern,
                        start_date,
                        end_date,
                    },
                ))
            })
            .await;

        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.symbol.cmp(&b.1.symbol))
        });
        ranked.truncate(request.top_n.max(1));
        Ok(ranked.into_iter().map(|(_, hit)| hit).collect())
    }
}
