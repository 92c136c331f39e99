//! Cross-rate computation between two pivot-denominated series.

use std::collections::BTreeSet;

use satrate_common::{BasePriceSample, CrossRateSample};

use crate::interpolation::Series;

/// Compute the ratio `priced / comparison` at every timestamp sampled by
/// either series.
///
/// Timestamps where either side has no estimate, where the comparison
/// estimate is zero, or where the ratio is not finite are omitted. Output is
/// strictly ascending by timestamp.
pub fn compute_cross_rate(
    priced: &[BasePriceSample],
    comparison: &[BasePriceSample],
) -> Vec<CrossRateSample> {
    let priced = Series::from_samples(priced.iter().copied());
    let comparison = Series::from_samples(comparison.iter().copied());
    compute_series_cross_rate(&priced, &comparison)
}

/// [`compute_cross_rate`] over already sorted series.
pub fn compute_series_cross_rate(priced: &Series, comparison: &Series) -> Vec<CrossRateSample> {
    if priced.is_empty() || comparison.is_empty() {
        return Vec::new();
    }

    let timestamps: BTreeSet<i64> = priced.timestamps().chain(comparison.timestamps()).collect();

    timestamps
        .into_iter()
        .filter_map(|ts| ratio_at(priced, comparison, ts).map(|r| CrossRateSample::new(ts, r)))
        .collect()
}

/// Interpolated ratio at a single timestamp.
pub fn ratio_at(priced: &Series, comparison: &Series, timestamp: i64) -> Option<f64> {
    let numerator = priced.estimate_at(timestamp)?;
    let denominator = comparison.estimate_at(timestamp)?;
    if denominator == 0.0 {
        return None;
    }

    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}
