//! An ordered sequence of daily bars for a single symbol.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::bar::DailyBar;

/// A complete daily price series for one symbol.
///
/// Invariants, enforced at construction and preserved by every method:
/// bars are strictly increasing by date, no date appears twice, and every
/// bar has a positive finite close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// The symbol this series belongs to (e.g., "005930", "AAPL").
    pub symbol: String,
    bars: Vec<DailyBar>,
}

impl Series {
    /// Builds a series from unordered provider output.
    ///
    /// Bars are sorted by date, duplicate dates collapse to the bar that
    /// appeared later in the input, and bars without a usable close are
    /// dropped.
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<DailyBar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
        for bar in bars {
            if bar.has_valid_close() {
                by_date.insert(bar.date, bar);
            }
        }
        Self {
            symbol: symbol.into(),
            bars: by_date.into_values().collect(),
        }
    }

    /// An empty series for a symbol. A provider reporting "no data for this
    /// window" is represented this way, not as an error.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// (date, close) pairs in date order, the shape the analysis layer
    /// consumes.
    pub fn dated_closes(&self) -> Vec<(NaiveDate, f64)> {
        self.bars.iter().map(|b| (b.date, b.close)).collect()
    }

    /// Restricts the series to the inclusive date range, keeping order.
    pub fn slice_window(&self, start: NaiveDate, end: NaiveDate) -> Series {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        Series {
            symbol: self.symbol.clone(),
            bars,
        }
    }

    /// Merges a freshly fetched tail into this series.
    ///
    /// The result is sorted and deduplicated by date; on a date collision the
    /// tail's bar wins (upstream may restate the most recent session).
    pub fn merge_tail(&mut self, tail: &Series) {
        if tail.is_empty() {
            return;
        }
        let mut by_date: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
        for bar in &self.bars {
            by_date.insert(bar.date, bar.clone());
        }
        for bar in &tail.bars {
            if bar.has_valid_close() {
                by_date.insert(bar.date, bar.clone());
            }
        }
        self.bars = by_date.into_values().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: date.parse().unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn construction_sorts_and_dedupes() {
        let s = Series::from_bars(
            "005930",
            vec![bar("2024-01-03", 3.0), bar("2024-01-01", 1.0), bar("2024-01-03", 4.0)],
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s.closes(), vec![1.0, 4.0]);
        assert_eq!(s.last_date(), Some("2024-01-03".parse().unwrap()));
    }

    #[test]
    fn construction_drops_non_positive_closes() {
        let s = Series::from_bars(
            "005930",
            vec![bar("2024-01-01", 10.0), bar("2024-01-02", 0.0), bar("2024-01-03", -5.0)],
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn merge_tail_keeps_later_value_on_collision() {
        let mut base = Series::from_bars(
            "005930",
            vec![bar("2024-01-01", 1.0), bar("2024-01-02", 2.0)],
        );
        let tail = Series::from_bars(
            "005930",
            vec![bar("2024-01-02", 2.5), bar("2024-01-03", 3.0)],
        );
        base.merge_tail(&tail);
        assert_eq!(base.closes(), vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn slice_window_is_inclusive() {
        let s = Series::from_bars(
            "005930",
            vec![bar("2024-01-01", 1.0), bar("2024-01-02", 2.0), bar("2024-01-03", 3.0)],
        );
        let sliced = s.slice_window("2024-01-02".parse().unwrap(), "2024-01-03".parse().unwrap());
        assert_eq!(sliced.closes(), vec![2.0, 3.0]);
    }
}
