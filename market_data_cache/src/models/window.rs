use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("window start {start} is after end {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
}

/// The date span a data request covers.
///
/// A window is both a request parameter (what to ask the remote source for)
/// and a cache address: each window maps to one cache file per symbol via
/// [`FetchWindow::cache_file_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchWindow {
    /// Inclusive date range, both bounds.
    Dated { start: NaiveDate, end: NaiveDate },
    /// Everything the source has, from first listing to the present.
    FullHistory,
}

impl FetchWindow {
    /// Build a dated window, rejecting ranges whose start falls after the end.
    ///
    /// A single-day window (`start == end`) is valid.
    pub fn dated(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::StartAfterEnd { start, end });
        }
        Ok(FetchWindow::Dated { start, end })
    }

    pub fn full_history() -> Self {
        FetchWindow::FullHistory
    }

    /// Cache file name for `symbol` under this window.
    ///
    /// Dated windows produce `{symbol}__{start}_{end}.json`; full-history
    /// windows produce `{symbol}__full.json`. The symbol is sanitized so the
    /// name stays filesystem-safe.
    pub fn cache_file_name(&self, symbol: &str) -> String {
        let symbol = sanitize_symbol(symbol);
        match self {
            FetchWindow::Dated { start, end } => format!("{symbol}__{start}_{end}.json"),
            FetchWindow::FullHistory => format!("{symbol}__full.json"),
        }
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchWindow::Dated { start, end } => write!(f, "{start}..{end}"),
            FetchWindow::FullHistory => write!(f, "full history"),
        }
    }
}

/// Replace characters that are unsafe in file names.
///
/// ASCII alphanumerics, `.`, `-`, and `_` pass through; everything else
/// (path separators, `^` index prefixes, whitespace) becomes `_`.
pub fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let err = FetchWindow::dated(d("2024-06-28"), d("2024-01-02")).unwrap_err();
        assert!(matches!(err, WindowError::StartAfterEnd { .. }));
    }

    #[test]
    fn single_day_window_is_valid() {
        let w = FetchWindow::dated(d("2024-03-15"), d("2024-03-15")).unwrap();
        assert_eq!(w.cache_file_name("005930"), "005930__2024-03-15_2024-03-15.json");
    }

    #[test]
    fn full_history_file_name() {
        assert_eq!(
            FetchWindow::full_history().cache_file_name("005930"),
            "005930__full.json"
        );
    }

    #[test]
    fn sanitizes_unsafe_symbol_characters() {
        assert_eq!(sanitize_symbol("^KS11"), "_KS11");
        assert_eq!(sanitize_symbol("BRK.B"), "BRK.B");
        assert_eq!(sanitize_symbol("a/b c"), "a_b_c");
    }
}
