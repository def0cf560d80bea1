//! Previous-session low-then-subsequent-high performance.

use crate::{candle::Candle, clock::SessionWindow, error::SkipReason};
use serde::{Deserialize, Serialize};

/// Session performance of one symbol.
///
/// `high_ts >= low_ts` always holds: the high is searched only at or after the low.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerformanceResult {
    pub symbol: String,
    pub low: f64,
    pub low_ts: i64,
    pub high: f64,
    pub high_ts: i64,
    pub pct: f64,
}

/// Evaluate `candles` inside `window` (inclusive both ends).
///
/// Fewer than two candles inside the window is a [`SkipReason::InsufficientData`].
pub fn evaluate_session(
    symbol: &str,
    candles: &[Candle],
    window: &SessionWindow,
) -> Result<PerformanceResult, SkipReason> {
    let in_window: Vec<&Candle> = candles
        .iter()
        .filter(|candle| window.contains(candle.timestamp))
        .collect();

    if in_window.len() < 2 {
        return Err(SkipReason::InsufficientData {
            candles: in_window.len(),
        });
    }

    // Minimum low, earliest occurrence wins ties
    let low_candle = in_window
        .iter()
        .copied()
        .reduce(|best, candle| if candle.low < best.low { candle } else { best })
        .ok_or(SkipReason::InsufficientData { candles: 0 })?;

    // Maximum high at or after the low, earliest occurrence wins ties
    let high_candle = in_window
        .iter()
        .copied()
        .filter(|candle| candle.timestamp >= low_candle.timestamp)
        .reduce(|best, candle| if candle.high > best.high { candle } else { best })
        .unwrap_or(low_candle);

    Ok(PerformanceResult {
        symbol: symbol.to_string(),
        low: low_candle.low,
        low_ts: low_candle.timestamp,
        high: high_candle.high,
        high_ts: high_candle.timestamp,
        pct: rise_pct(low_candle.low, high_candle.high),
    })
}

/// Percentage rise from `low` to `high`, clamped to zero on bad or inverted data.
fn rise_pct(low: f64, high: f64) -> f64 {
    if low > 0.0 && high >= low {
        (high - low) / low * 100.0
    } else {
        0.0
    }
}
