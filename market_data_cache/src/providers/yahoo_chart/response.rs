use chrono::DateTime;
use serde::Deserialize;

use crate::models::bar::DailyBar;

/// Error message fragments that mean "this symbol no longer trades" rather
/// than "the fetch failed". Matching is case-insensitive.
pub const DELISTED_ERROR_PATTERNS: &[&str] = &[
    "symbol may be delisted",
    "no data found",
    "not found",
    "delisted",
    "invalid symbol",
    "no timezone found",
];

/// Whether an API error message describes a dead symbol.
pub fn is_delisted_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    DELISTED_ERROR_PATTERNS.iter().any(|p| lower.contains(p))
}

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Deserialize, Debug)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteBlock>,
}

/// Column-oriented OHLCV arrays, index-aligned with `timestamp`.
///
/// Yahoo nulls out individual cells for halted or partial sessions, so every
/// column is a vector of options.
#[derive(Deserialize, Debug, Default)]
pub struct QuoteBlock {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

impl ChartResponse {
    pub fn error_description(&self) -> Option<String> {
        self.chart.error.as_ref().map(|e| {
            if e.description.is_empty() {
                e.code.clone()
            } else {
                e.description.clone()
            }
        })
    }

    /// Flattens the column-oriented payload into daily bars.
    ///
    /// Rows without a close are dropped. Missing open/high/low cells fall
    /// back to the close and a missing volume becomes zero, so one nulled
    /// column does not throw away an otherwise usable session. Bar dates are
    /// the UTC dates of the session timestamps.
    pub fn into_daily_bars(self) -> Vec<DailyBar> {
        let Some(result) = self.chart.result.and_then(|mut r| {
            if r.is_empty() { None } else { Some(r.remove(0)) }
        }) else {
            return Vec::new();
        };

        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Vec::new();
        };

        let cell = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let Some(close) = cell(&quote.close, i) else {
                continue;
            };
            let Some(date) = DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()) else {
                continue;
            };

            bars.push(DailyBar {
                date,
                open: cell(&quote.open, i).unwrap_or(close),
                high: cell(&quote.high, i).unwrap_or(close),
                low: cell(&quote.low, i).unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_rows_and_skips_null_closes() {
        let payload = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": {
                        "quote": [{
                            "open":   [100.0, null, 104.0],
                            "high":   [105.0, null, 108.0],
                            "low":    [ 99.0, null, 103.0],
                            "close":  [102.0, null, 107.0],
                            "volume": [1000,  null, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let parsed: ChartResponse = serde_json::from_str(payload).unwrap();
        let bars = parsed.into_daily_bars();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date.to_string(), "2024-01-02");
        assert_eq!(bars[0].close, 102.0);
        assert_eq!(bars[1].date.to_string(), "2024-01-04");
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn missing_ohl_cells_fall_back_to_close() {
        let payload = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600],
                    "indicators": {
                        "quote": [{
                            "open": [null],
                            "high": [null],
                            "low": [null],
                            "close": [50.0],
                            "volume": [10]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let parsed: ChartResponse = serde_json::from_str(payload).unwrap();
        let bars = parsed.into_daily_bars();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 50.0);
        assert_eq!(bars[0].high, 50.0);
        assert_eq!(bars[0].low, 50.0);
    }

    #[test]
    fn error_payload_surfaces_description() {
        let payload = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;

        let parsed: ChartResponse = serde_json::from_str(payload).unwrap();
        let desc = parsed.error_description().unwrap();
        assert!(is_delisted_error(&desc));
    }

    #[test]
    fn delisted_matching_is_case_insensitive() {
        assert!(is_delisted_error("Symbol May Be DELISTED"));
        assert!(!is_delisted_error("internal server error"));
    }
}
