//! Canonical in-memory representation of a daily price bar (OHLCV).
//!
//! This struct is the standard output of all
//! [`MarketDataProvider`](crate::providers::MarketDataProvider) implementations
//! and the unit stored in cached series payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily bar (OHLCV) for one calendar date.
///
/// Vendor-agnostic; providers map their wire formats onto this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// The calendar date of this bar (exchange-local trading day).
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price during the day.
    pub high: f64,

    /// Lowest price during the day.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Shares traded during the day.
    pub volume: u64,
}

impl DailyBar {
    /// A bar is usable for analysis only when its close is a positive,
    /// finite number.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
