//! Candle sources.
//!
//! The analytics only ever see `Vec<Candle>` ascending by timestamp. Venue transport lives
//! behind [`CandleSource`]; this crate ships [`SnapshotSource`], which replays kline
//! snapshots saved to disk.

use crate::{
    candle::{Candle, Timeframe},
    error::SourceError,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Rate limit assumed when a source does not advertise one.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(200);

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Up to `limit` candles of `timeframe` opening at or after `since` (epoch ms),
    /// ascending by timestamp.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, SourceError>;

    /// Minimum spacing between calls advertised by the venue.
    fn rate_limit(&self) -> Duration {
        DEFAULT_RATE_LIMIT
    }
}

/// One kline column: a JSON number, a numeric string, or anything else (ignored).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KlineValue {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl KlineValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            KlineValue::Number(value) => Some(*value),
            KlineValue::Text(raw) => raw.trim().parse().ok(),
            KlineValue::Other(_) => None,
        }
    }
}

/// Kline row as returned by venue REST APIs: `[open_time, open, high, low, close, volume, ..]`.
/// Extra trailing columns (close time, quote volume, trade count) are ignored.
fn kline_to_candle(row: &[KlineValue]) -> Option<Candle> {
    match row {
        [open_time, open, high, low, close, volume, ..] => Some(Candle {
            timestamp: open_time.as_f64()? as i64,
            open: open.as_f64()?,
            high: high.as_f64()?,
            low: low.as_f64()?,
            close: close.as_f64()?,
            volume: volume.as_f64()?,
        }),
        _ => None,
    }
}

/// Parse a kline snapshot into candles ascending by timestamp, one per timestamp.
///
/// Rows with unparsable prices are dropped.
pub fn parse_klines(json: &str) -> Result<Vec<Candle>, serde_json::Error> {
    let rows: Vec<Vec<KlineValue>> = serde_json::from_str(json)?;

    let mut candles: Vec<Candle> = rows
        .iter()
        .filter_map(|row| kline_to_candle(row))
        .collect();

    candles.sort_by_key(|candle| candle.timestamp);
    candles.dedup_by_key(|candle| candle.timestamp);
    Ok(candles)
}

/// Replays `<dir>/<symbol>.json` kline snapshots.
///
/// `/` and `:` in symbols map to `_` in file names, so `BTC/USDT:USDT` reads
/// `BTC_USDT_USDT.json`. The file is shared by every timeframe; `timeframe` is only logged.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: PathBuf,
    rate_limit: Duration,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rate_limit: Duration::ZERO,
        }
    }

    /// Simulate a venue rate limit.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, symbol: &str) -> PathBuf {
        let file_name: String = symbol
            .chars()
            .map(|c| if matches!(c, '/' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl CandleSource for SnapshotSource {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, SourceError> {
        let path = self.snapshot_path(symbol);
        let unavailable = |reason: String| SourceError::Unavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| unavailable(format!("{}: {error}", path.display())))?;
        let candles = parse_klines(&json)
            .map_err(|error| unavailable(format!("{}: {error}", path.display())))?;

        tracing::debug!(
            %symbol,
            %timeframe,
            since,
            limit,
            total = candles.len(),
            "replaying kline snapshot"
        );

        Ok(candles
            .into_iter()
            .filter(|candle| candle.timestamp >= since)
            .take(limit)
            .collect())
    }

    fn rate_limit(&self) -> Duration {
        self.rate_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_klines() {
        struct TestCase {
            input: &'static str,
            expected: Vec<(i64, f64)>,
        }

        let tests = vec![
            TestCase {
                // TC0: numeric rows
                input: "[[0, 1.0, 2.0, 0.5, 1.5, 10.0], [300000, 1.5, 2.5, 1.0, 2.0, 5.0]]",
                expected: vec![(0, 1.5), (300000, 2.0)],
            },
            TestCase {
                // TC1: Binance style string prices with trailing columns
                input: r#"[[60000, "1.0", "2.0", "0.5", "1.25", "3", 119999, "10", 5, "1", "1", "0"]]"#,
                expected: vec![(60000, 1.25)],
            },
            TestCase {
                // TC2: unsorted rows with a duplicate timestamp and a broken row
                input: r#"[[600000, 3, 3, 3, 3, 1], [0, 1, 1, 1, 1, 1], [0, 1, 1, 1, 1, 1], [300000, "x", 2, 2, 2, 1]]"#,
                expected: vec![(0, 1.0), (600000, 3.0)],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual: Vec<(i64, f64)> = parse_klines(test.input)
                .unwrap()
                .into_iter()
                .map(|candle| (candle.timestamp, candle.close))
                .collect();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_parse_klines_not_an_array() {
        assert!(parse_klines(r#"{"code": 510}"#).is_err());
    }

    #[test]
    fn test_snapshot_path_escapes_symbol() {
        let source = SnapshotSource::new("/tmp/klines");
        assert_eq!(
            source.snapshot_path("BTC/USDT:USDT"),
            PathBuf::from("/tmp/klines/BTC_USDT_USDT.json")
        );
    }

    #[tokio::test]
    async fn test_snapshot_source_missing_file_is_unavailable() {
        let source = SnapshotSource::new("/nonexistent/session-rank");
        let result = source.fetch("ETH_USDT", Timeframe::M5, 0, 10).await;
        assert!(matches!(
            result,
            Err(SourceError::Unavailable { symbol, .. }) if symbol == "ETH_USDT"
        ));
    }

    #[tokio::test]
    async fn test_snapshot_source_since_and_limit() {
        let dir = std::env::temp_dir().join(format!("session-rank-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SOL_USDT.json"),
            "[[0,1,1,1,1,1],[300000,2,2,2,2,1],[600000,3,3,3,3,1],[900000,4,4,4,4,1]]",
        )
        .unwrap();

        let source = SnapshotSource::new(&dir);
        let candles = source.fetch("SOL_USDT", Timeframe::M5, 300000, 2).await.unwrap();
        let closes: Vec<f64> = candles.iter().map(|candle| candle.close).collect();

        assert_eq!(closes, vec![2.0, 3.0]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
