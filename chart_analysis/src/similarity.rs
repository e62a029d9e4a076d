//! Cosine similarity between two daily close series.
//!
//! The candidate is aligned onto the base's date index. Interior gaps
//! are bridged by linear interpolation; gaps at either end cannot be
//! bridged and disqualify the candidate. Both vectors are z-scored
//! before the cosine, so only the shape of the trajectory matters.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

/// Overlap requirements for [`score`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimilarityParams {
    /// Overlap below this count is never enough.
    pub min_overlap_floor: usize,
    /// Overlap must also cover this fraction of the base length.
    pub min_overlap_fraction: f64,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            min_overlap_floor: 30,
            min_overlap_fraction: 0.5,
        }
    }
}

impl SimilarityParams {
    /// Number of shared dates required for a base of `base_len` days.
    pub fn min_required(&self, base_len: usize) -> usize {
        let fractional = (base_len as f64 * self.min_overlap_fraction) as usize;
        self.min_overlap_floor.max(fractional)
    }
}

/// Scores `candidate` against `base` over the base's date index.
///
/// Both inputs are `(date, close)` pairs already restricted to the
/// window of interest, strictly increasing by date. Returns `None` when
/// the overlap is too thin, when a gap at the start or end of the
/// alignment cannot be interpolated, or when either side has zero
/// variance. A successful score lies in `[-1.0, 1.0]`.
pub fn score(
    base: &[(NaiveDate, f64)],
    candidate: &[(NaiveDate, f64)],
    params: &SimilarityParams,
) -> Option<f64> {
    if base.is_empty() {
        return None;
    }
    let by_date: HashMap<NaiveDate, f64> = candidate.iter().copied().collect();
    let mut aligned: Vec<Option<f64>> = Vec::with_capacity(base.len());
    let mut overlap = 0usize;
    for (date, _) in base {
        let hit = by_date.get(date).copied();
        if hit.is_some() {
            overlap += 1;
        }
        aligned.push(hit);
    }
    if overlap < params.min_required(base.len()) {
        return None;
    }
    let filled = interpolate_gaps(aligned)?;
    let base_closes: Vec<f64> = base.iter().map(|(_, close)| *close).collect();
    let v1 = zscore(&base_closes)?;
    let v2 = zscore(&filled)?;
    Some(cosine(&v1, &v2))
}

/// Fills interior runs of missing values linearly between the nearest
/// present neighbors. A missing value at either end has only one
/// neighbor and makes the alignment unusable.
fn interpolate_gaps(values: Vec<Option<f64>>) -> Option<Vec<f64>> {
    let first = values.iter().position(Option::is_some)?;
    let last = values.iter().rposition(Option::is_some)?;
    if first != 0 || last + 1 != values.len() {
        return None;
    }
    let mut filled: Vec<f64> = Vec::with_capacity(values.len());
    let mut i = 0;
    while i < values.len() {
        if let Some(v) = values[i] {
            filled.push(v);
            i += 1;
            continue;
        }
        let mut end = i;
        while values[end].is_none() {
            end += 1;
        }
        let Some(right) = values[end] else {
            return None;
        };
        let left = filled[i - 1];
        let span = (end - i + 1) as f64;
        for step in 1..=(end - i) {
            filled.push(left + (right - left) * step as f64 / span);
        }
        i = end;
    }
    Some(filled)
}

/// Zero mean, unit variance. `None` when the input is constant and has
/// no shape to compare.
pub fn zscore(values: &[f64]) -> Option<Vec<f64>> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some(values.iter().map(|v| (v - mean) / std).collect())
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Days;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn days(start: NaiveDate, closes: &[f64]) -> Vec<(NaiveDate, f64)> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| (start + Days::new(i as u64), close))
            .collect()
    }

    fn wavy(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + ((i * 37) % 17) as f64).collect()
    }

    #[test]
    fn a_series_scores_one_against_itself() {
        let base = days(d(2024, 1, 1), &wavy(40));
        let s = score(&base, &base, &SimilarityParams::default()).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_short_series_score_one_with_a_relaxed_floor() {
        let closes = [100.0, 105.0, 110.0, 108.0, 102.0];
        let base = days(d(2024, 1, 1), &closes);
        let params = SimilarityParams {
            min_overlap_floor: 5,
            min_overlap_fraction: 0.5,
        };
        let s = score(&base, &base, &params).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn a_mirrored_series_scores_minus_one() {
        let base_closes = wavy(40);
        let mirrored: Vec<f64> = base_closes.iter().map(|c| 300.0 - c).collect();
        let base = days(d(2024, 1, 1), &base_closes);
        let candidate = days(d(2024, 1, 1), &mirrored);
        let s = score(&base, &candidate, &SimilarityParams::default()).unwrap();
        assert!((s + 1.0).abs() < 1e-9);
    }

    #[test]
    fn thin_overlap_is_rejected() {
        // 200-day base, candidate shares only the first 10 dates.
        let base = days(d(2024, 1, 1), &wavy(200));
        let candidate: Vec<_> = base[..10].to_vec();
        assert_eq!(
            score(&base, &candidate, &SimilarityParams::default()),
            None
        );
    }

    #[test]
    fn overlap_threshold_tracks_base_length() {
        let params = SimilarityParams::default();
        assert_eq!(params.min_required(7), 30);
        assert_eq!(params.min_required(40), 30);
        assert_eq!(params.min_required(61), 30);
        assert_eq!(params.min_required(63), 31);
        assert_eq!(params.min_required(100), 50);
    }

    #[test]
    fn interior_gaps_are_bridged_linearly() {
        // Candidate misses one date of a linear base; interpolation
        // reconstructs the missing value exactly.
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let base = days(d(2024, 1, 1), &closes);
        let mut candidate = base.clone();
        candidate.remove(20);
        let s = score(&base, &candidate, &SimilarityParams::default()).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn a_gap_at_the_start_disqualifies_the_candidate() {
        let base = days(d(2024, 1, 1), &wavy(40));
        let candidate: Vec<_> = base[2..].to_vec();
        assert_eq!(
            score(&base, &candidate, &SimilarityParams::default()),
            None
        );
    }

    #[test]
    fn a_gap_at_the_end_disqualifies_the_candidate() {
        let base = days(d(2024, 1, 1), &wavy(40));
        let candidate: Vec<_> = base[..38].to_vec();
        assert_eq!(
            score(&base, &candidate, &SimilarityParams::default()),
            None
        );
    }

    #[test]
    fn a_constant_candidate_has_no_shape_to_compare() {
        let base = days(d(2024, 1, 1), &wavy(40));
        let candidate = days(d(2024, 1, 1), &vec![100.0; 40]);
        assert_eq!(
            score(&base, &candidate, &SimilarityParams::default()),
            None
        );
    }

    #[test]
    fn candidate_dates_outside_the_base_index_are_ignored() {
        let base = days(d(2024, 2, 1), &wavy(40));
        let mut candidate = days(d(2024, 1, 20), &[1.0; 12]);
        candidate.extend(base.iter().copied());
        candidate.extend(days(d(2024, 3, 20), &[1.0; 12]));
        let s = score(&base, &candidate, &SimilarityParams::default()).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn an_empty_base_scores_nothing() {
        let candidate = days(d(2024, 1, 1), &wavy(40));
        assert_eq!(score(&[], &candidate, &SimilarityParams::default()), None);
    }

    proptest! {
        #[test]
        fn scores_stay_in_bounds(
            base_closes in proptest::collection::vec(1.0f64..1000.0, 30..100),
            cand_closes in proptest::collection::vec(1.0f64..1000.0, 30..100),
        ) {
            let start = d(2024, 1, 1);
            let base = days(start, &base_closes);
            let candidate = days(start, &cand_closes);
            if let Some(s) = score(&base, &candidate, &SimilarityParams::default()) {
                prop_assert!((-1.0..=1.0).contains(&s));
            }
        }
    }
}
