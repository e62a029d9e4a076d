//! Local peak and trough detection over a close-price slice.
//!
//! A point counts as a peak when it is strictly higher than both of its
//! neighbors (troughs mirror this). Optional distance and prominence
//! filters thin out noisy candidates before the pattern rules run.

use serde::Deserialize;

/// Filtering knobs for [`find_peaks`] and [`find_troughs`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtremaParams {
    /// Minimum index gap between two surviving extrema. Values `<= 1`
    /// keep every candidate.
    pub min_distance: usize,
    /// Minimum prominence, expressed as a fraction of the slice maximum.
    /// `0.0` keeps every candidate.
    pub min_prominence: f64,
}

impl Default for ExtremaParams {
    fn default() -> Self {
        Self {
            min_distance: 1,
            min_prominence: 0.0,
        }
    }
}

/// Returns the indices of local maxima in `closes`, ascending.
///
/// # Examples
///
/// ```
/// use chart_analysis::extrema::{ExtremaParams, find_peaks};
///
/// let closes = [10.0, 12.0, 15.0, 12.0, 18.0, 14.0, 10.0, 8.0];
/// let peaks = find_peaks(&closes, &ExtremaParams::default());
/// assert_eq!(peaks, vec![2, 4]);
/// ```
pub fn find_peaks(closes: &[f64], params: &ExtremaParams) -> Vec<usize> {
    let candidates = strict_extrema(closes, true);
    filter_extrema(candidates, closes, params, true)
}

/// Returns the indices of local minima in `closes`, ascending.
pub fn find_troughs(closes: &[f64], params: &ExtremaParams) -> Vec<usize> {
    let candidates = strict_extrema(closes, false);
    filter_extrema(candidates, closes, params, false)
}

fn strict_extrema(closes: &[f64], peaks: bool) -> Vec<usize> {
    if closes.len() < 3 {
        return Vec::new();
    }
    (1..closes.len() - 1)
        .filter(|&i| {
            if peaks {
                closes[i] > closes[i - 1] && closes[i] > closes[i + 1]
            } else {
                closes[i] < closes[i - 1] && closes[i] < closes[i + 1]
            }
        })
        .collect()
}

fn filter_extrema(
    candidates: Vec<usize>,
    closes: &[f64],
    params: &ExtremaParams,
    peaks: bool,
) -> Vec<usize> {
    let mut kept = candidates;
    if params.min_prominence > 0.0 {
        let scale = closes.iter().copied().fold(f64::MIN, f64::max);
        let threshold = params.min_prominence * scale;
        kept.retain(|&i| prominence(closes, i, peaks) >= threshold);
    }
    prune_by_distance(kept, closes, params.min_distance, peaks)
}

/// Height of an extremum above (peaks) or below (troughs) the higher of
/// the two base levels reached before a more extreme point closes it off
/// on each side.
fn prominence(closes: &[f64], i: usize, peak: bool) -> f64 {
    let height = closes[i];
    let mut left_base = height;
    for &v in closes[..i].iter().rev() {
        if (peak && v > height) || (!peak && v < height) {
            break;
        }
        left_base = if peak { left_base.min(v) } else { left_base.max(v) };
    }
    let mut right_base = height;
    for &v in &closes[i + 1..] {
        if (peak && v > height) || (!peak && v < height) {
            break;
        }
        right_base = if peak { right_base.min(v) } else { right_base.max(v) };
    }
    if peak {
        height - left_base.max(right_base)
    } else {
        left_base.min(right_base) - height
    }
}

/// Greedy pruning: the most extreme candidates win, and anything closer
/// than `min_distance` to a winner is dropped.
fn prune_by_distance(
    indices: Vec<usize>,
    closes: &[f64],
    min_distance: usize,
    peaks: bool,
) -> Vec<usize> {
    if min_distance <= 1 || indices.len() < 2 {
        return indices;
    }
    let mut order = indices;
    order.sort_by(|&a, &b| {
        let by_value = if peaks {
            closes[b].total_cmp(&closes[a])
        } else {
            closes[a].total_cmp(&closes[b])
        };
        by_value.then(a.cmp(&b))
    });
    let mut kept: Vec<usize> = Vec::new();
    for idx in order {
        if kept.iter().all(|&k| k.abs_diff(idx) >= min_distance) {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept
}
