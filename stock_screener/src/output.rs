//! JSON result protocol shared by the CLI commands.
//!
//! Results go to stdout as pretty-printed JSON; failures go to stderr
//! as a single `{"error": "..."}` line so a supervising process can
//! tell the two apart.

use chart_analysis::PatternKind;
use chrono::NaiveDate;
use serde::Serialize;

/// One pattern-scan hit, bounded by the analyzed window.
#[derive(Debug, Clone, Serialize)]
pub struct PatternHit {
    pub symbol: String,
    pub name: String,
    pub pattern: PatternKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One entry of a similarity ranking.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarStock {
    pub ticker: String,
    pub name: String,
    pub cosine_similarity: f64,
}

/// Envelope for the `similar` command.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarReport {
    pub base_symbol: String,
    pub similar_stocks: Vec<SimilarStock>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Two symbols aligned on their shared dates, for the `compare`
/// command. Rendering the actual chart is left to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub base_symbol: String,
    pub compare_symbol: String,
    pub overlap_days: usize,
    /// Absent when one side is flat over the overlap (no z-score exists).
    pub cosine_similarity: Option<f64>,
    pub base: Vec<ClosePoint>,
    pub compare: Vec<ClosePoint>,
}

/// Counters from a bulk cache refresh.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UpdateSummary {
    pub updated: usize,
    pub failed: usize,
}

/// Writes `value` to stdout as pretty JSON.
pub fn emit<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes the error protocol line to stderr.
pub fn emit_error(message: &str) {
    let payload = serde_json::json!({ "error": message });
    eprintln!("{payload}");
}
