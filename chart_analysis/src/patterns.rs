//! Rule-based chart pattern detection.
//!
//! Each detector is a pure predicate over a close-price slice. Extrema
//! come from [`crate::extrema`]; the rules compare their heights and the
//! retracements between them against the thresholds in [`PatternParams`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extrema::{ExtremaParams, find_peaks, find_troughs};

#[derive(Debug, Error)]
#[error("Unknown pattern: {}", name)]
pub struct PatternParseError {
    pub name: String,
}

/// The chart patterns the engine knows how to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    CupAndHandle,
}

impl PatternKind {
    pub const ALL: [PatternKind; 5] = [
        PatternKind::HeadAndShoulders,
        PatternKind::InverseHeadAndShoulders,
        PatternKind::DoubleTop,
        PatternKind::DoubleBottom,
        PatternKind::CupAndHandle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "head_and_shoulders",
            PatternKind::InverseHeadAndShoulders => "inverse_head_and_shoulders",
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::CupAndHandle => "cup_and_handle",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head_and_shoulders" => Ok(PatternKind::HeadAndShoulders),
            "inverse_head_and_shoulders" => Ok(PatternKind::InverseHeadAndShoulders),
            "double_top" => Ok(PatternKind::DoubleTop),
            "double_bottom" => Ok(PatternKind::DoubleBottom),
            "cup_and_handle" => Ok(PatternKind::CupAndHandle),
            other => Err(PatternParseError {
                name: other.to_string(),
            }),
        }
    }
}

/// Numeric thresholds for the pattern rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternParams {
    /// Slices shorter than this never match any pattern.
    pub min_len: usize,
    /// Extra length requirement for the cup-and-handle heuristic.
    pub cup_min_len: usize,
    /// Relative tolerance between the two tops (or bottoms) of a pair
    /// pattern.
    pub pair_tolerance: f64,
    /// Minimum retracement between the two extremes of a pair pattern.
    pub retracement: f64,
    /// Relative tolerance between left and right shoulder heights.
    pub shoulder_tolerance: f64,
    /// Fractional margin by which the head must clear both shoulders.
    pub head_prominence: f64,
    /// Require the last close to break through the neckline between the
    /// shoulders before a head-and-shoulders counts.
    pub neckline_break: bool,
    /// Allowed pullback band for the cup handle, as fractions of the
    /// handle high.
    pub handle_pullback_min: f64,
    pub handle_pullback_max: f64,
    /// Extrema filtering applied before any rule runs.
    pub extrema: ExtremaParams,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            min_len: 30,
            cup_min_len: 40,
            pair_tolerance: 0.03,
            retracement: 0.05,
            shoulder_tolerance: 0.10,
            head_prominence: 0.10,
            neckline_break: false,
            handle_pullback_min: 0.02,
            handle_pullback_max: 0.08,
            extrema: ExtremaParams::default(),
        }
    }
}

impl PatternParams {
    /// Defaults with the shoulder comparison set to `tolerance`. The
    /// head margin tracks the same value, so a candidate shoulder within
    /// tolerance of the head disqualifies the formation.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            shoulder_tolerance: tolerance,
            head_prominence: tolerance,
            ..Self::default()
        }
    }
}

/// Runs one pattern rule against a close-price slice.
///
/// # Examples
///
/// ```
/// use chart_analysis::patterns::{PatternKind, PatternParams, detect};
///
/// let flat = vec![100.0; 60];
/// assert!(!detect(&flat, PatternKind::DoubleTop, &PatternParams::default()));
/// ```
pub fn detect(closes: &[f64], kind: PatternKind, params: &PatternParams) -> bool {
    if closes.len() < params.min_len {
        return false;
    }
    match kind {
        PatternKind::HeadAndShoulders => detect_head_and_shoulders(closes, params),
        PatternKind::InverseHeadAndShoulders => detect_inverse_head_and_shoulders(closes, params),
        PatternKind::DoubleTop => detect_double_top(closes, params),
        PatternKind::DoubleBottom => detect_double_bottom(closes, params),
        PatternKind::CupAndHandle => detect_cup_and_handle(closes, params),
    }
}

/// Population standard deviation of the last `window` closes. Scan
/// results are ranked by this, most volatile first.
pub fn trailing_volatility(closes: &[f64], window: usize) -> f64 {
    if closes.is_empty() || window == 0 {
        return 0.0;
    }
    let tail = &closes[closes.len().saturating_sub(window)..];
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let variance = tail.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / tail.len() as f64;
    variance.sqrt()
}

/// Two adjacent peaks of near-equal height with a valley between them
/// that retraces below both.
fn detect_double_top(closes: &[f64], params: &PatternParams) -> bool {
    let peaks = find_peaks(closes, &params.extrema);
    for pair in peaks.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        let v1 = closes[p1];
        let v2 = closes[p2];
        if v1 <= 0.0 {
            continue;
        }
        if (v1 - v2).abs() / v1 > params.pair_tolerance {
            continue;
        }
        let valley = min_of(&closes[p1..=p2]);
        if valley < v1.min(v2) * (1.0 - params.retracement) {
            return true;
        }
    }
    false
}

/// Mirror of [`detect_double_top`] on troughs, with the rebound between
/// them rising above both.
fn detect_double_bottom(closes: &[f64], params: &PatternParams) -> bool {
    let troughs = find_troughs(closes, &params.extrema);
    for pair in troughs.windows(2) {
        let (t1, t2) = (pair[0], pair[1]);
        let v1 = closes[t1];
        let v2 = closes[t2];
        if (v1 - v2).abs() / v1.max(1e-9) > params.pair_tolerance {
            continue;
        }
        let rebound = max_of(&closes[t1..=t2]);
        if rebound > v1.max(v2) * (1.0 + params.retracement) {
            return true;
        }
    }
    false
}

/// The tallest peak is the head; the nearest peak on each side is its
/// shoulder. A side without a peak of its own falls back to that side's
/// highest close. The head must clear both shoulders by the prominence
/// margin and the shoulders must be of similar height. With
/// `neckline_break` set, the last close must also undercut the lowest
/// close between the shoulders.
fn detect_head_and_shoulders(closes: &[f64], params: &PatternParams) -> bool {
    let peaks = find_peaks(closes, &params.extrema);
    if peaks.len() < 2 {
        return false;
    }
    let mut head_pos = 0;
    for (pos, &idx) in peaks.iter().enumerate().skip(1) {
        if closes[idx] > closes[peaks[head_pos]] {
            head_pos = pos;
        }
    }
    let head = peaks[head_pos];
    let left = peaks[..head_pos]
        .last()
        .copied()
        .or_else(|| argmax(&closes[..head]));
    let right = peaks[head_pos + 1..]
        .first()
        .copied()
        .or_else(|| argmax(&closes[head + 1..]).map(|i| head + 1 + i));
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    let margin = 1.0 + params.head_prominence;
    if closes[head] <= closes[left] * margin || closes[head] <= closes[right] * margin {
        return false;
    }
    if !shoulders_match(closes[left], closes[right], params.shoulder_tolerance) {
        return false;
    }
    if params.neckline_break {
        let neckline = min_of(&closes[left..=right]);
        return closes[closes.len() - 1] < neckline;
    }
    true
}

/// Mirror of [`detect_head_and_shoulders`] on troughs, with the head
/// undercutting both shoulders and the optional neckline broken upward.
fn detect_inverse_head_and_shoulders(closes: &[f64], params: &PatternParams) -> bool {
    let troughs = find_troughs(closes, &params.extrema);
    if troughs.len() < 2 {
        return false;
    }
    let mut head_pos = 0;
    for (pos, &idx) in troughs.iter().enumerate().skip(1) {
        if closes[idx] < closes[troughs[head_pos]] {
            head_pos = pos;
        }
    }
    let head = troughs[head_pos];
    let left = troughs[..head_pos]
        .last()
        .copied()
        .or_else(|| argmin(&closes[..head]));
    let right = troughs[head_pos + 1..]
        .first()
        .copied()
        .or_else(|| argmin(&closes[head + 1..]).map(|i| head + 1 + i));
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    let margin = 1.0 - params.head_prominence;
    if closes[head] >= closes[left] * margin || closes[head] >= closes[right] * margin {
        return false;
    }
    if !shoulders_match(closes[left], closes[right], params.shoulder_tolerance) {
        return false;
    }
    if params.neckline_break {
        let neckline = max_of(&closes[left..=right]);
        return closes[closes.len() - 1] > neckline;
    }
    true
}

fn shoulders_match(left: f64, right: f64, tolerance: f64) -> bool {
    (left - right).abs() / left.max(right).max(1e-9) <= tolerance
}

/// U-shaped base with the low in the middle half of the window, a close
/// above the window median at the end, and a shallow pullback over the
/// final bars.
fn detect_cup_and_handle(closes: &[f64], params: &PatternParams) -> bool {
    let n = closes.len();
    if n < params.cup_min_len {
        return false;
    }
    let mut bottom = 0;
    for (i, &v) in closes.iter().enumerate().skip(1) {
        if v < closes[bottom] {
            bottom = i;
        }
    }
    let quarter = n / 4;
    if bottom < quarter || bottom >= n - quarter {
        return false;
    }
    let last = closes[n - 1];
    if last <= median(closes) {
        return false;
    }
    let tail_len = (n / 10).max(5);
    let tail = &closes[n - tail_len..];
    let pullback = (max_of(tail) - last) / max_of(tail).max(1e-9);
    pullback >= params.handle_pullback_min && pullback <= params.handle_pullback_max
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

fn argmin(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
