//! NaN-aware summary statistics

use crate::error::{AttributionError, Result};

/// Values that are present (not NaN, not infinite)
pub fn present_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    values.into_iter().copied().filter(|v| v.is_finite()).collect()
}

/// Percentile with linear interpolation between order statistics
///
/// Missing values are skipped. `pct` is clamped to [0, 100], so the 0th percentile is
/// the minimum and the 100th the maximum. Returns `None` when nothing is present.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted = present_values(values);
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Selection threshold at `pct`
///
/// # Errors
/// [`AttributionError::EmptySeries`] when no value is present.
pub fn threshold(values: &[f64], pct: f64) -> Result<f64> {
    percentile(values, pct).ok_or(AttributionError::EmptySeries)
}

/// Mean of the present values, NaN when there are none
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
