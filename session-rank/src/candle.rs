//! Candle model and fixed-size bucket aggregation.
//!
//! Candles are produced by the [`CandleSource`](crate::source::CandleSource), ascending by
//! open timestamp, and consumed read-only by the analytics.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One OHLCV bar, keyed by its open time in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Venue candle timeframe.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Bar duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        const MINUTE_MS: i64 = 60_000;
        match self {
            Timeframe::M1 => MINUTE_MS,
            Timeframe::M3 => 3 * MINUTE_MS,
            Timeframe::M5 => 5 * MINUTE_MS,
            Timeframe::M15 => 15 * MINUTE_MS,
            Timeframe::M30 => 30 * MINUTE_MS,
            Timeframe::H1 => 60 * MINUTE_MS,
            Timeframe::H4 => 240 * MINUTE_MS,
            Timeframe::D1 => 1440 * MINUTE_MS,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Timeframe::M1),
            "3m" => Ok(Timeframe::M3),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(ConfigError::invalid("TIMEFRAME", other, "unknown timeframe")),
        }
    }
}

/// Fine candles folded into one fixed-size bucket.
///
/// open = first open, high = max high, low = min low, close = last close, volume = sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleBucket {
    /// Bucket start (the boundary instant it belongs to).
    pub start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Number of fine candles folded in.
    pub candles: usize,
}

impl CandleBucket {
    /// Start a new bucket at `start` seeded with its first fine candle.
    pub fn open_with(start: i64, candle: &Candle) -> Self {
        Self {
            start,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            candles: 1,
        }
    }

    /// Fold the next fine candle (same bucket, later timestamp) into this bucket.
    pub fn update(&mut self, candle: &Candle) {
        self.high = self.high.max(candle.high);
        self.low = self.low.min(candle.low);
        self.close = candle.close;
        self.volume += candle.volume;
        self.candles += 1;
    }

    /// Intrabar range as a percentage of the open, zero when the open is non-positive.
    pub fn range_pct(&self) -> f64 {
        if self.open > 0.0 {
            (self.high - self.low) / self.open * 100.0
        } else {
            0.0
        }
    }
}
