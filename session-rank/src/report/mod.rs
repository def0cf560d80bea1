//! Ranking of session results and their rendering into size-bounded messages.

pub mod chunk;
pub mod format;

use crate::{clock::SessionWindow, performance::PerformanceResult};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

pub use chunk::{Append, MessageBuffer, MessageLimits, chunk_messages};
pub use format::{Markers, ReportFormatter, TrendLayout};

/// Trailing interval series of one symbol.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Trend {
    pub deltas: Vec<f64>,
    /// Present only when resampling in bucketed mode.
    pub ranges: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankedEntry {
    /// 1 = highest `pct`.
    pub rank: usize,
    pub result: PerformanceResult,
    pub deltas: Vec<f64>,
    pub ranges: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankedReport {
    pub window: SessionWindow,
    pub entries: Vec<RankedEntry>,
}

/// Sort descending by `pct`, keep the first `depth`, and number from 1.
///
/// The sort is stable: equal `pct` keep their input (watch-list) order.
pub fn rank<I>(results: I, depth: Option<usize>) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (PerformanceResult, Trend)>,
{
    let mut results: Vec<(PerformanceResult, Trend)> = results.into_iter().collect();
    results.sort_by(|(a, _), (b, _)| b.pct.total_cmp(&a.pct));

    results
        .into_iter()
        .take(depth.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, (result, trend))| RankedEntry {
            rank: index + 1,
            result,
            deltas: trend.deltas,
            ranges: trend.ranges,
        })
        .collect()
}
