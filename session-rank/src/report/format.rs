//! Text rendering of ranked entries.

use super::RankedEntry;
use crate::clock::{SessionClock, SessionWindow};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Indent of the delta and range lines under a rank line.
const SERIES_INDENT: &str = "      ";

/// Session performance at or above which the rank line carries the hot flair.
const HOT_PCT: f64 = 10.0;

/// How the delta line is laid out.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize, Serialize)]
pub enum TrendLayout {
    /// `Δ | Δ | Δ | Δ`
    #[default]
    Continuous,
    /// `0% | Δ | Δ | Δ | HHh`, used for the first report of a day.
    FirstRun,
}

/// Attention markers attached to values whose magnitude reaches `threshold` percent.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Markers {
    pub threshold: f64,
    pub up: String,
    pub down: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            up: "🚀".to_string(),
            down: "💥".to_string(),
        }
    }
}

impl Markers {
    fn attach(&self, value: f64, rendered: String) -> String {
        if value >= self.threshold {
            format!("{rendered} {}", self.up)
        } else if value <= -self.threshold {
            format!("{rendered} {}", self.down)
        } else {
            rendered
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReportFormatter {
    pub clock: SessionClock,
    pub markers: Markers,
    pub layout: TrendLayout,
    pub trend_count: usize,
}

impl ReportFormatter {
    /// `📈 2024-03-09 session (05:00→04:59) performance ranking`
    pub fn header(&self, window: &SessionWindow) -> String {
        let anchor = self.clock.anchor_hour();
        format!(
            "📈 {} session ({:02}:00→{:02}:59) performance ranking",
            self.clock.local_date_label(window.start),
            anchor,
            (anchor + 23) % 24,
        )
    }

    pub fn rank_line(&self, rank: usize, symbol: &str, pct: f64) -> String {
        let flair = if pct >= HOT_PCT { "🔥" } else { "⚡️" };
        match rank {
            1 => format!("🥇   {symbol} {flair}  {pct:.2}%"),
            2 => format!("🥈   {symbol} {flair}  {pct:.2}%"),
            3 => format!("🥉   {symbol} {flair}  {pct:.2}%"),
            _ => format!("{rank}.  {symbol} {flair}  {pct:.2}%"),
        }
    }

    pub fn delta_line(&self, deltas: &[f64], now: DateTime<Utc>) -> String {
        if deltas.is_empty() {
            return format!("{SERIES_INDENT}-");
        }

        let parts: Vec<String> = deltas
            .iter()
            .map(|delta| self.markers.attach(*delta, format!("{delta:+.2}%")))
            .collect();

        let shown = match self.layout {
            TrendLayout::Continuous => {
                let skip = parts.len().saturating_sub(self.trend_count);
                parts.into_iter().skip(skip).join(" | ")
            }
            TrendLayout::FirstRun => {
                let skip = parts.len().saturating_sub(3);
                let hour_label = format!("{:02}h", self.clock.local_hour(now));
                std::iter::once("0%".to_string())
                    .chain(parts.into_iter().skip(skip))
                    .chain(std::iter::once(hour_label))
                    .join(" | ")
            }
        };

        format!("{SERIES_INDENT}{shown}")
    }

    pub fn range_line(&self, ranges: &[f64]) -> String {
        if ranges.is_empty() {
            return format!("{SERIES_INDENT}↕ -");
        }

        let skip = ranges.len().saturating_sub(self.trend_count);
        let shown = ranges
            .iter()
            .skip(skip)
            .map(|range| self.markers.attach(*range, format!("{range:.2}%")))
            .join(" | ");

        format!("{SERIES_INDENT}↕ {shown}")
    }

    /// Rank line, delta line and, when present, range line.
    pub fn entry(&self, entry: &RankedEntry, now: DateTime<Utc>) -> String {
        let mut lines = vec![
            self.rank_line(entry.rank, &entry.result.symbol, entry.result.pct),
            self.delta_line(&entry.deltas, now),
        ];
        if let Some(ranges) = &entry.ranges {
            lines.push(self.range_line(ranges));
        }
        lines.join("\n")
    }
}
