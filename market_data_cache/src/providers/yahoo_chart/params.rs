use chrono::{Days, NaiveDate};

use crate::models::window::FetchWindow;

/// Builds the query string for a v8 chart request.
///
/// Daily bars always use `interval=1d`. A dated window becomes a
/// `period1`/`period2` pair of unix timestamps where `period2` is exclusive,
/// so the end date is pushed forward one day to keep the window inclusive on
/// both sides. Full history uses `range=max` instead.
pub fn construct_params(window: FetchWindow) -> Vec<(String, String)> {
    let mut params = vec![("interval".to_string(), "1d".to_string())];

    match window {
        FetchWindow::Dated { start, end } => {
            params.push(("period1".to_string(), midnight_utc(start).to_string()));
            let exclusive_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
            params.push(("period2".to_string(), midnight_utc(exclusive_end).to_string()));
        }
        FetchWindow::FullHistory => {
            params.push(("range".to_string(), "max".to_string()));
        }
    }

    params
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
        .timestamp()
}
