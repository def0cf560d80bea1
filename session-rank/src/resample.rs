//! Step-aligned resampling of irregular candle series.
//!
//! Boundaries run `B0, B0 + step, ..., B0 + step * n` where `n` is the number of completed
//! steps at `now`, so no boundary ever lies after `now`. Both the boundary list and the
//! candle series are ascending, so each resampler walks the candles once with a cursor that
//! never rewinds.

use crate::{
    candle::{Candle, CandleBucket},
    error::SkipReason,
};
use serde::{Deserialize, Serialize};

/// Boundary instant and the close of the latest candle at or before it.
///
/// `price` is `None` when no such candle exists yet or its close is non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundaryPoint {
    pub timestamp: i64,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BoundaryGrid {
    points: Vec<BoundaryPoint>,
}

impl BoundaryGrid {
    pub fn new(points: Vec<BoundaryPoint>) -> Self {
        Self { points }
    }

    /// Build a grid from raw prices on consecutive boundaries starting at `base`.
    pub fn from_prices(base: i64, step_ms: i64, prices: &[Option<f64>]) -> Self {
        let points = prices
            .iter()
            .enumerate()
            .map(|(index, price)| BoundaryPoint {
                timestamp: base + step_ms * index as i64,
                price: *price,
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[BoundaryPoint] {
        &self.points
    }

    pub fn prices(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|point| point.price)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Fine candles folded into the step beginning at `start`.
///
/// `bucket` is `None` when no candle falls inside `[start, start + step)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalBucket {
    pub start: i64,
    pub bucket: Option<CandleBucket>,
}

/// Bucketed variant of the boundary grid: one [`CandleBucket`] per boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketGrid {
    buckets: Vec<IntervalBucket>,
}

impl BucketGrid {
    pub fn buckets(&self) -> &[IntervalBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Each bucket treated as one boundary, priced at its close.
    pub fn boundary_grid(&self) -> BoundaryGrid {
        let points = self
            .buckets
            .iter()
            .map(|interval| BoundaryPoint {
                timestamp: interval.start,
                price: interval
                    .bucket
                    .map(|bucket| bucket.close)
                    .filter(|close| *close > 0.0),
            })
            .collect();
        BoundaryGrid { points }
    }
}

/// Boundary instants from `base` up to the last completed step at or before `now`.
///
/// Zero completed steps yields at most one point and no interval, so it is reported as
/// [`SkipReason::NoCompletedSteps`].
pub fn boundary_instants(base: i64, step_ms: i64, now: i64) -> Result<Vec<i64>, SkipReason> {
    if step_ms <= 0 || now < base {
        return Err(SkipReason::NoCompletedSteps);
    }

    let steps = (now - base) / step_ms;
    if steps < 1 {
        return Err(SkipReason::NoCompletedSteps);
    }

    Ok((0..=steps).map(|index| base + step_ms * index).collect())
}

/// Sample the close of the latest candle at or before each boundary.
pub fn resample_boundaries(
    candles: &[Candle],
    base: i64,
    step_ms: i64,
    now: i64,
) -> Result<BoundaryGrid, SkipReason> {
    if candles.is_empty() {
        return Err(SkipReason::NoCandles);
    }

    let instants = boundary_instants(base, step_ms, now)?;
    let mut points = Vec::with_capacity(instants.len());
    let mut cursor = 0;

    for boundary in instants {
        while candles
            .get(cursor + 1)
            .is_some_and(|next| next.timestamp <= boundary)
        {
            cursor += 1;
        }

        let price = candles
            .get(cursor)
            .filter(|candle| candle.timestamp <= boundary && candle.close > 0.0)
            .map(|candle| candle.close);

        points.push(BoundaryPoint {
            timestamp: boundary,
            price,
        });
    }

    Ok(BoundaryGrid { points })
}

/// Fold the candles inside each `[boundary, boundary + step)` into a [`CandleBucket`].
///
/// Matches [`resample_boundaries`] prices whenever the fine series is already step-aligned.
pub fn resample_buckets(
    candles: &[Candle],
    base: i64,
    step_ms: i64,
    now: i64,
) -> Result<BucketGrid, SkipReason> {
    if candles.is_empty() {
        return Err(SkipReason::NoCandles);
    }

    let instants = boundary_instants(base, step_ms, now)?;
    let mut buckets = Vec::with_capacity(instants.len());
    let mut cursor = candles.partition_point(|candle| candle.timestamp < base);

    for start in instants {
        let end = start + step_ms;
        let mut bucket: Option<CandleBucket> = None;

        while let Some(candle) = candles.get(cursor).filter(|candle| candle.timestamp < end) {
            match bucket.as_mut() {
                Some(bucket) => bucket.update(candle),
                None => bucket = Some(CandleBucket::open_with(start, candle)),
            }
            cursor += 1;
        }

        buckets.push(IntervalBucket { start, bucket });
    }

    Ok(BucketGrid { buckets })
}
