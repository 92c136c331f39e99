//! Price estimation between and beyond samples.
//!
//! A series is treated as a mapping from timestamp to price. Estimates at a
//! sampled timestamp are exact; between two samples they are linear; outside
//! the sampled range the nearest edge price is held flat.

use satrate_common::BasePriceSample;

/// Estimate the price at `target` from an arbitrarily ordered series.
///
/// Returns `None` only when the series is empty. Linear in the series
/// length; use [`Series`] when estimating many timestamps.
pub fn estimate_at(series: &[BasePriceSample], target: i64) -> Option<f64> {
    let mut before: Option<&BasePriceSample> = None;
    let mut after: Option<&BasePriceSample> = None;

    for sample in series {
        let ts = sample.timestamp_millis;
        if ts == target {
            return Some(sample.price_in_base_units);
        }
        if ts < target {
            if before.map_or(true, |b| ts > b.timestamp_millis) {
                before = Some(sample);
            }
        } else if after.map_or(true, |a| ts < a.timestamp_millis) {
            after = Some(sample);
        }
    }

    interpolate(before, after, target)
}

/// Combine the neighbours of a target timestamp into an estimate.
fn interpolate(
    before: Option<&BasePriceSample>,
    after: Option<&BasePriceSample>,
    target: i64,
) -> Option<f64> {
    match (before, after) {
        (Some(b), Some(a)) => {
            // Widened so neighbours at opposite ends of the i64 range cannot overflow.
            let span = (i128::from(a.timestamp_millis) - i128::from(b.timestamp_millis)) as f64;
            let offset = (i128::from(target) - i128::from(b.timestamp_millis)) as f64;
            let delta = a.price_in_base_units - b.price_in_base_units;
            Some(b.price_in_base_units + offset / span * delta)
        }
        (Some(b), None) => Some(b.price_in_base_units),
        (None, Some(a)) => Some(a.price_in_base_units),
        (None, None) => None,
    }
}

/// A series sorted by timestamp with duplicate timestamps removed.
///
/// When the input repeats a timestamp the first occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    samples: Vec<BasePriceSample>,
}

impl Series {
    /// Build a series from samples in any order.
    pub fn from_samples(samples: impl IntoIterator<Item = BasePriceSample>) -> Self {
        let mut samples: Vec<BasePriceSample> = samples.into_iter().collect();
        // Stable sort so dedup keeps the first sample seen for a timestamp.
        samples.sort_by_key(|s| s.timestamp_millis);
        samples.dedup_by_key(|s| s.timestamp_millis);
        Self { samples }
    }

    /// Estimate the price at `target` by binary search.
    pub fn estimate_at(&self, target: i64) -> Option<f64> {
        let idx = self
            .samples
            .partition_point(|s| s.timestamp_millis < target);

        let after = self.samples.get(idx);
        if let Some(exact) = after.filter(|s| s.timestamp_millis == target) {
            return Some(exact.price_in_base_units);
        }

        let before = idx.checked_sub(1).and_then(|i| self.samples.get(i));
        interpolate(before, after, target)
    }

    /// Sorted samples.
    pub fn samples(&self) -> &[BasePriceSample] {
        &self.samples
    }

    /// Sample timestamps in ascending order.
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.samples.iter().map(|s| s.timestamp_millis)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest sample, if any.
    pub fn first(&self) -> Option<&BasePriceSample> {
        self.samples.first()
    }

    /// Newest sample, if any.
    pub fn last(&self) -> Option<&BasePriceSample> {
        self.samples.last()
    }

    pub fn into_samples(self) -> Vec<BasePriceSample> {
        self.samples
    }
}

impl FromIterator<BasePriceSample> for Series {
    fn from_iter<I: IntoIterator<Item = BasePriceSample>>(iter: I) -> Self {
        Self::from_samples(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(ts: i64, price: f64) -> BasePriceSample {
        BasePriceSample::new(ts, price)
    }

    #[test]
    fn test_exact_match() {
        let series = vec![s(0, 100.0), s(7, 0.1 + 0.2), s(10, 200.0)];
        assert_eq!(estimate_at(&series, 7), Some(0.1 + 0.2));
        assert_eq!(Series::from_samples(series).estimate_at(7), Some(0.1 + 0.2));
    }

    #[test]
    fn test_linear_interpolation() {
        let series = vec![s(0, 100.0), s(10, 200.0)];
        assert_eq!(estimate_at(&series, 5), Some(150.0));
        assert_eq!(estimate_at(&series, 2), Some(120.0));
    }

    #[test]
    fn test_forward_extrapolation() {
        assert_eq!(estimate_at(&[s(0, 100.0)], 10), Some(100.0));
    }

    #[test]
    fn test_backward_extrapolation() {
        assert_eq!(estimate_at(&[s(10, 100.0)], 0), Some(100.0));
    }

    #[test]
    fn test_full_range_timestamps() {
        let series = vec![s(i64::MIN, 1.0), s(i64::MAX, 3.0)];
        let linear = estimate_at(&series, 0).unwrap();
        assert!((linear - 2.0).abs() < 1e-9);

        let sorted = Series::from_samples(series);
        assert!((sorted.estimate_at(0).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(sorted.estimate_at(i64::MAX), Some(3.0));
    }

    #[test]
    fn test_empty_series_not_available() {
        assert_eq!(estimate_at(&[], 42), None);
        assert_eq!(Series::default().estimate_at(42), None);
    }

    #[test]
    fn test_unsorted_input() {
        let series = vec![s(30, 400.0), s(10, 200.0), s(0, 100.0), s(20, 300.0)];
        assert_eq!(estimate_at(&series, 15), Some(250.0));
        assert_eq!(estimate_at(&series, 40), Some(400.0));
        assert_eq!(estimate_at(&series, -5), Some(100.0));
    }

    #[test]
    fn test_interpolation_uses_nearest_neighbours() {
        let series = Series::from_samples(vec![s(0, 0.0), s(10, 100.0), s(100, 1000.0)]);
        assert_eq!(series.estimate_at(5), Some(50.0));
        assert_eq!(series.estimate_at(55), Some(550.0));
    }

    #[test]
    fn test_series_dedup_keeps_first() {
        let series = Series::from_samples(vec![s(10, 1.0), s(0, 5.0), s(10, 2.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.estimate_at(10), Some(1.0));
        assert_eq!(series.timestamps().collect::<Vec<_>>(), vec![0, 10]);
    }

    proptest! {
        #[test]
        fn prop_scan_matches_binary_search(
            points in proptest::collection::btree_map(-1_000i64..1_000, 0.0f64..1e9, 0..40),
            target in -1_200i64..1_200,
        ) {
            let samples: Vec<BasePriceSample> =
                points.iter().rev().map(|(ts, p)| s(*ts, *p)).collect();
            let series = Series::from_samples(samples.clone());
            prop_assert_eq!(estimate_at(&samples, target), series.estimate_at(target));
        }

        #[test]
        fn prop_estimate_bounded_by_neighbours(
            points in proptest::collection::btree_map(0i64..10_000, 0.0f64..1e6, 1..30),
            target in 0i64..10_000,
        ) {
            let series: Series = points.iter().map(|(ts, p)| s(*ts, *p)).collect();
            let estimate = series.estimate_at(target).unwrap();
            let min = points.values().cloned().fold(f64::INFINITY, f64::min);
            let max = points.values().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(estimate >= min - 1e-6 && estimate <= max + 1e-6);
        }
    }
}
