//! Similarity ranking against a base symbol, plus two-symbol comparison.

use std::collections::HashSet;
use std::sync::Arc;

use chart_analysis::{SimilarityParams, score, similarity::zscore};
use chrono::NaiveDate;
use market_data_cache::{FetchWindow, MarketDataProvider, RosterProvider, Series};
use snafu::{ResultExt, ensure};

use crate::output::{ClosePoint, CompareReport, SimilarReport, SimilarStock};
use crate::render::{ChartRenderer, CompareCharts};

use super::{
    BadWindowSnafu, FlatBaseSnafu, Orchestrator, RenderSnafu, ScreenerError, ThinOverlapSnafu,
};

/// Minimum shared trading days for a pairwise comparison.
pub const COMPARE_MIN_OVERLAP: usize = 5;

/// One similarity ranking: base symbol, window, how many to keep.
#[derive(Debug, Clone)]
pub struct SimilarRequest {
    pub base_symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub top_n: usize,
}

/// One pairwise comparison over a window.
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub base_symbol: String,
    pub compare_symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl<P: MarketDataProvider + 'static> Orchestrator<P> {
    /// Ranks every other roster symbol by how closely its normalized price
    /// path over the window tracks the base symbol's.
    ///
    /// Candidates whose overlap with the base window is too thin (or whose
    /// price is flat) score as not-comparable and drop out; a base symbol
    /// with no bars or a flat price aborts the run instead, since every
    /// score would be meaningless.
    pub async fn rank_similar<R: RosterProvider>(
        &self,
        listing: Option<&R>,
        request: &SimilarRequest,
        params: &SimilarityParams,
    ) -> Result<SimilarReport, ScreenerError> {
        let window =
            FetchWindow::dated(request.start, request.end).context(BadWindowSnafu)?;
        let base = self.load_one(&request.base_symbol, window).await?;
        ensure!(
            zscore(&base.closes()).is_some(),
            FlatBaseSnafu {
                symbol: request.base_symbol.clone(),
            }
        );

        let roster = self.roster(listing).await?;
        tracing::info!(
            base = %request.base_symbol,
            symbols = roster.len(),
            window = %window,
            "starting similarity ranking"
        );

        let universe = self
            .load_universe(&roster, window, Some(&request.base_symbol))
            .await;

        let base_pairs = Arc::new(base.dated_closes());
        let params = params.clone();
        let mut scored: Vec<SimilarStock> = self
            .pool
            .run_blocking(universe, move |(ticker, name, series)| {
                score(&base_pairs, &series.dated_closes(), &params).map(|cosine_similarity| {
                    SimilarStock {
                        ticker,
                        name,
                        cosine_similarity,
                    }
                })
            })
            .await;

        scored.sort_by(|a, b| {
            b.cosine_similarity
                .total_cmp(&a.cosine_similarity)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        scored.truncate(request.top_n.max(1));

        Ok(SimilarReport {
            base_symbol: request.base_symbol.clone(),
            similar_stocks: scored,
        })
    }

    /// Aligns two symbols on their shared trading days, scores the pair,
    /// and renders both aligned windows when a renderer is injected.
    pub async fn compare_pair(
        &self,
        request: &CompareRequest,
        renderer: Option<&dyn ChartRenderer>,
    ) -> Result<(CompareReport, Option<CompareCharts>), ScreenerError> {
        let window =
            FetchWindow::dated(request.start, request.end).context(BadWindowSnafu)?;
        let base = self.load_one(&request.base_symbol, window).await?;
        let other = self.load_one(&request.compare_symbol, window).await?;

        let other_dates: HashSet<NaiveDate> = other.bars().iter().map(|b| b.date).collect();
        let common: Vec<NaiveDate> = base
            .bars()
            .iter()
            .map(|b| b.date)
            .filter(|d| other_dates.contains(d))
            .collect();
        ensure!(
            common.len() >= COMPARE_MIN_OVERLAP,
            ThinOverlapSnafu {
                days: common.len(),
                required: COMPARE_MIN_OVERLAP,
            }
        );

        let score_params = SimilarityParams {
            min_overlap_floor: COMPARE_MIN_OVERLAP,
            min_overlap_fraction: 0.0,
        };
        let cosine = score(&base.dated_closes(), &other.dated_closes(), &score_params);

        let in_common: HashSet<NaiveDate> = common.iter().copied().collect();
        let report = CompareReport {
            base_symbol: request.base_symbol.clone(),
            compare_symbol: request.compare_symbol.clone(),
            overlap_days: common.len(),
            cosine_similarity: cosine,
            base: aligned_points(&base, &in_common),
            compare: aligned_points(&other, &in_common),
        };

        // common has at least COMPARE_MIN_OVERLAP entries past the ensure.
        let charts = match renderer {
            Some(renderer) => {
                let first = common[0];
                let last = common[common.len() - 1];
                let base_png = renderer
                    .render(&base.slice_window(first, last), &request.base_symbol)
                    .context(RenderSnafu)?;
                let compare_png = renderer
                    .render(&other.slice_window(first, last), &request.compare_symbol)
                    .context(RenderSnafu)?;
                Some(CompareCharts {
                    base_png,
                    compare_png,
                })
            }
            None => None,
        };

        Ok((report, charts))
    }
}

fn aligned_points(series: &Series, keep: &HashSet<NaiveDate>) -> Vec<ClosePoint> {
    series
        .bars()
        .iter()
        .filter(|b| keep.contains(&b.date))
        .map(|b| ClosePoint {
            date: b.date,
            close: b.close,
        })
        .collect()
}
