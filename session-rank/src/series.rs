//! Interval delta and range series derived from a boundary grid.
//!
//! All values are percentages. Missing prices never propagate: an interval without two
//! usable prices contributes an explicit `0.0`.

use crate::resample::{BoundaryGrid, BucketGrid};

/// `(P_i - P_{i-1}) / P_{i-1} * 100` for each adjacent pair of boundary prices.
///
/// Returns `len(grid) - 1` values.
pub fn interval_deltas(grid: &BoundaryGrid) -> Vec<f64> {
    let prices: Vec<Option<f64>> = grid.prices().collect();
    prices
        .windows(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(previous), Some(current)) if previous > 0.0 => {
                (current - previous) / previous * 100.0
            }
            _ => 0.0,
        })
        .collect()
}

/// `(high_i - low_i) / open_i * 100` for each interval after the first boundary.
///
/// Interval `i` is the bucket treated as boundary `i`, so the series lines up with
/// [`interval_deltas`] of [`BucketGrid::boundary_grid`].
pub fn interval_ranges(grid: &BucketGrid) -> Vec<f64> {
    grid.buckets()
        .iter()
        .skip(1)
        .map(|interval| interval.bucket.map_or(0.0, |bucket| bucket.range_pct()))
        .collect()
}

/// Last `n` values, or all of them when fewer exist. Never padded.
pub fn trailing(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{candle::Candle, resample::resample_buckets};

    fn assert_series_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} != {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 0.005, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_interval_deltas() {
        struct TestCase {
            prices: Vec<Option<f64>>,
            expected: Vec<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: +5.00%, -5.71%, 0.00%
                prices: vec![Some(100.0), Some(105.0), Some(99.0), Some(99.0)],
                expected: vec![5.0, -5.714, 0.0],
            },
            TestCase {
                // TC1: absent prices zero-fill both adjacent intervals
                prices: vec![Some(100.0), None, Some(110.0), Some(121.0)],
                expected: vec![0.0, 0.0, 10.0],
            },
            TestCase {
                // TC2: leading absent boundary before the first candle
                prices: vec![None, Some(50.0), Some(49.0)],
                expected: vec![0.0, -2.0],
            },
            TestCase {
                // TC3: single boundary has no interval
                prices: vec![Some(100.0)],
                expected: vec![],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let grid = BoundaryGrid::from_prices(0, 1_800_000, &test.prices);
            let actual = interval_deltas(&grid);
            assert_eq!(actual.len(), grid.len().saturating_sub(1), "TC{} failed", index);
            assert_series_eq(&actual, &test.expected);
        }
    }

    #[test]
    fn test_interval_ranges() {
        let step = 1_800_000;
        let candles = vec![
            Candle::new(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            Candle::new(step, 100.0, 104.0, 98.0, 103.0, 1.0),
            Candle::new(3 * step, 0.0, 1.0, 0.0, 1.0, 1.0),
        ];

        let grid = resample_buckets(&candles, 0, step, 3 * step).unwrap();
        let ranges = interval_ranges(&grid);

        // Interval 2 is empty, interval 3 has a zero open
        assert_series_eq(&ranges, &[6.0, 0.0, 0.0]);
        assert_eq!(ranges.len(), interval_deltas(&grid.boundary_grid()).len());
    }

    #[test]
    fn test_trailing_never_pads() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(trailing(&values, 4), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trailing(&values[..2], 4), &[1.0, 2.0]);
        assert!(trailing(&[], 4).is_empty());
    }
}
