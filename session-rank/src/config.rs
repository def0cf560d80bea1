//! Run configuration.
//!
//! Built once at start (from defaults, builder calls, or key/value pairs such as the process
//! environment), validated, then passed by reference into every component.

use crate::{
    candle::Timeframe,
    clock::SessionClock,
    error::ConfigError,
    report::{Markers, MessageLimits, ReportFormatter, TrendLayout},
};
use serde::{Deserialize, Serialize};
use std::{ffi::OsString, fmt::Display, str::FromStr, time::Duration};

/// Largest real-world UTC offset.
const MAX_UTC_OFFSET_HOURS: i32 = 14;

/// Keys read by [`RankerConfig::from_vars`].
pub const CONFIG_KEYS: &[&str] = &[
    "SESSION_ANCHOR_HOUR",
    "UTC_OFFSET_HOURS",
    "TIMEFRAME",
    "TREND_TIMEFRAME",
    "TREND_STEP_MIN",
    "TREND_COUNT",
    "TREND_MODE",
    "FIRST_RUN",
    "MESSAGE_CHAR_CAP",
    "LINES_PER_MESSAGE",
    "DELTA_EMOJI_THRESH",
    "UP_MARKER",
    "DOWN_MARKER",
    "TOP_N",
    "SESSION_FETCH_LIMIT",
    "TREND_FETCH_LIMIT",
    "MIN_REQUEST_INTERVAL_MS",
    "CONCURRENCY",
    "SYMBOL_TIMEOUT_SECS",
];

/// How the trend fetch is mapped onto the boundary grid.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize, Serialize)]
pub enum TrendMode {
    /// Latest close at or before each boundary.
    #[default]
    Boundary,
    /// Fine candles folded into one bucket per step; adds the range series.
    Bucketed,
}

impl FromStr for TrendMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boundary" => Ok(TrendMode::Boundary),
            "bucketed" => Ok(TrendMode::Bucketed),
            other => Err(ConfigError::invalid(
                "TREND_MODE",
                other,
                "expected boundary or bucketed",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankerConfig {
    /// Local hour sessions and the resampling base are anchored to.
    pub anchor_hour: u32,
    pub utc_offset_hours: i32,
    pub session_timeframe: Timeframe,
    pub trend_timeframe: Timeframe,
    pub step_minutes: u32,
    /// Trailing intervals reported per symbol.
    pub trend_count: usize,
    pub trend_mode: TrendMode,
    pub layout: TrendLayout,
    pub limits: MessageLimits,
    pub markers: Markers,
    /// Ranking depth, `None` for every ranked symbol.
    pub depth: Option<usize>,
    pub session_fetch_limit: usize,
    pub trend_fetch_limit: usize,
    /// Floor applied to the source's advertised rate limit.
    pub min_request_interval: Duration,
    /// Symbols processed at once. 1 processes the watch-list sequentially.
    pub concurrency: usize,
    /// Per source call.
    pub symbol_timeout: Duration,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            anchor_hour: 5,
            utc_offset_hours: 9,
            session_timeframe: Timeframe::M5,
            trend_timeframe: Timeframe::M5,
            step_minutes: 30,
            trend_count: 4,
            trend_mode: TrendMode::Boundary,
            layout: TrendLayout::Continuous,
            limits: MessageLimits::default(),
            markers: Markers::default(),
            depth: None,
            session_fetch_limit: 800,
            trend_fetch_limit: 1000,
            min_request_interval: Duration::from_millis(150),
            concurrency: 1,
            symbol_timeout: Duration::from_secs(20),
        }
    }
}

impl RankerConfig {
    /// Build from key/value pairs (eg/ [`utf8_vars`] of `std::env::vars_os()`), starting from
    /// the defaults.
    ///
    /// Unrecognised keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "SESSION_ANCHOR_HOUR" => config.anchor_hour = parse(key, value)?,
                "UTC_OFFSET_HOURS" => config.utc_offset_hours = parse(key, value)?,
                "TIMEFRAME" => config.session_timeframe = parse_keyed(key, value)?,
                "TREND_TIMEFRAME" => config.trend_timeframe = parse_keyed(key, value)?,
                "TREND_STEP_MIN" => config.step_minutes = parse(key, value)?,
                "TREND_COUNT" => config.trend_count = parse(key, value)?,
                "TREND_MODE" => config.trend_mode = parse_keyed(key, value)?,
                "FIRST_RUN" => {
                    config.layout = if parse_flag(value) {
                        TrendLayout::FirstRun
                    } else {
                        TrendLayout::Continuous
                    }
                }
                "MESSAGE_CHAR_CAP" => config.limits.max_chars = parse(key, value)?,
                "LINES_PER_MESSAGE" => config.limits.max_entries = Some(parse(key, value)?),
                "DELTA_EMOJI_THRESH" => config.markers.threshold = parse(key, value)?,
                "UP_MARKER" => config.markers.up = value.to_string(),
                "DOWN_MARKER" => config.markers.down = value.to_string(),
                "TOP_N" => config.depth = Some(parse(key, value)?),
                "SESSION_FETCH_LIMIT" => config.session_fetch_limit = parse(key, value)?,
                "TREND_FETCH_LIMIT" => config.trend_fetch_limit = parse(key, value)?,
                "MIN_REQUEST_INTERVAL_MS" => {
                    config.min_request_interval = Duration::from_millis(parse(key, value)?)
                }
                "CONCURRENCY" => config.concurrency = parse(key, value)?,
                "SYMBOL_TIMEOUT_SECS" => {
                    config.symbol_timeout = Duration::from_secs(parse(key, value)?)
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.anchor_hour >= 24 {
            return Err(invalid("SESSION_ANCHOR_HOUR", self.anchor_hour, "must be 0-23"));
        }
        if self.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            return Err(invalid("UTC_OFFSET_HOURS", self.utc_offset_hours, "must be -14..=14"));
        }
        if self.step_minutes == 0 {
            return Err(invalid("TREND_STEP_MIN", self.step_minutes, "must be positive"));
        }
        if self.trend_count == 0 {
            return Err(invalid("TREND_COUNT", self.trend_count, "must be positive"));
        }
        if self.limits.max_chars == 0 {
            return Err(invalid("MESSAGE_CHAR_CAP", self.limits.max_chars, "must be positive"));
        }
        if self.limits.max_entries == Some(0) {
            return Err(invalid("LINES_PER_MESSAGE", 0, "must be positive"));
        }
        if !self.markers.threshold.is_finite() || self.markers.threshold < 0.0 {
            return Err(invalid(
                "DELTA_EMOJI_THRESH",
                self.markers.threshold,
                "must be a non-negative percentage",
            ));
        }
        if self.session_fetch_limit == 0 {
            return Err(invalid("SESSION_FETCH_LIMIT", 0, "must be positive"));
        }
        if self.trend_fetch_limit == 0 {
            return Err(invalid("TREND_FETCH_LIMIT", 0, "must be positive"));
        }
        if self.concurrency == 0 {
            return Err(invalid("CONCURRENCY", self.concurrency, "must be positive"));
        }
        if self.symbol_timeout.is_zero() {
            return Err(invalid("SYMBOL_TIMEOUT_SECS", 0, "must be positive"));
        }
        Ok(())
    }

    pub fn clock(&self) -> SessionClock {
        SessionClock::new(self.utc_offset_hours * 3600, self.anchor_hour)
    }

    pub fn step_ms(&self) -> i64 {
        i64::from(self.step_minutes) * 60_000
    }

    pub fn formatter(&self) -> ReportFormatter {
        ReportFormatter {
            clock: self.clock(),
            markers: self.markers.clone(),
            layout: self.layout,
            trend_count: self.trend_count,
        }
    }

    pub fn with_anchor_hour(mut self, anchor_hour: u32) -> Self {
        self.anchor_hour = anchor_hour;
        self
    }

    pub fn with_utc_offset_hours(mut self, utc_offset_hours: i32) -> Self {
        self.utc_offset_hours = utc_offset_hours;
        self
    }

    pub fn with_step_minutes(mut self, step_minutes: u32) -> Self {
        self.step_minutes = step_minutes;
        self
    }

    pub fn with_trend_count(mut self, trend_count: usize) -> Self {
        self.trend_count = trend_count;
        self
    }

    pub fn with_trend_mode(mut self, trend_mode: TrendMode) -> Self {
        self.trend_mode = trend_mode;
        self
    }

    pub fn with_layout(mut self, layout: TrendLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.markers.threshold = threshold;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_symbol_timeout(mut self, timeout: Duration) -> Self {
        self.symbol_timeout = timeout;
        self
    }
}

/// Adapt OS key/value pairs (eg/ `std::env::vars_os()`) for [`RankerConfig::from_vars`].
///
/// Pairs that are not valid UTF-8 are skipped, except under one of [`CONFIG_KEYS`], where
/// the value is a [`ConfigError::Invalid`].
pub fn utf8_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            if CONFIG_KEYS.contains(&key.as_str()) {
                Some(utf8_value(&key, value).map(|value| (key, value)))
            } else {
                value.into_string().ok().map(|value| Ok((key, value)))
            }
        })
        .collect()
}

/// `value` as a `String`, or a [`ConfigError::Invalid`] naming `key`.
pub fn utf8_value(key: &str, value: OsString) -> Result<String, ConfigError> {
    value
        .into_string()
        .map_err(|value| ConfigError::invalid(key, &value.to_string_lossy(), "not valid UTF-8"))
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|error: T::Err| ConfigError::invalid(key, value, error.to_string()))
}

/// Parse with a type whose own error is a [`ConfigError`], attributing it to `key`.
fn parse_keyed<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = ConfigError>,
{
    value.parse().map_err(|error| match error {
        ConfigError::Invalid { value, reason, .. } => ConfigError::Invalid {
            key: key.to_string(),
            value,
            reason,
        },
        other => other,
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn invalid(key: &str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::invalid(key, &value.to_string(), reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RankerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_ms(), 1_800_000);
        assert_eq!(config.clock(), SessionClock::default());
        assert_eq!(config.limits.max_chars, 3500);
        assert_eq!(config.limits.max_entries, None);
        assert_eq!(config.depth, None);
    }

    #[test]
    fn test_from_vars() {
        let config = RankerConfig::from_vars([
            ("TOP_N", "20"),
            ("TREND_STEP_MIN", "15"),
            ("TREND_COUNT", "6"),
            ("LINES_PER_MESSAGE", "10"),
            ("DELTA_EMOJI_THRESH", "1.5"),
            ("FIRST_RUN", "Yes"),
            ("TIMEFRAME", "15m"),
            ("TREND_MODE", "bucketed"),
            ("CONCURRENCY", "4"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();

        assert_eq!(config.depth, Some(20));
        assert_eq!(config.step_minutes, 15);
        assert_eq!(config.trend_count, 6);
        assert_eq!(config.limits.max_entries, Some(10));
        assert_eq!(config.markers.threshold, 1.5);
        assert_eq!(config.layout, TrendLayout::FirstRun);
        assert_eq!(config.session_timeframe, Timeframe::M15);
        assert_eq!(config.trend_mode, TrendMode::Bucketed);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_from_vars_invalid() {
        struct TestCase {
            key: &'static str,
            value: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: not a number
                key: "TREND_STEP_MIN",
                value: "thirty",
            },
            TestCase {
                // TC1: zero step
                key: "TREND_STEP_MIN",
                value: "0",
            },
            TestCase {
                // TC2: anchor past the end of the day
                key: "SESSION_ANCHOR_HOUR",
                value: "24",
            },
            TestCase {
                // TC3: negative threshold
                key: "DELTA_EMOJI_THRESH",
                value: "-2",
            },
            TestCase {
                // TC4: NaN threshold
                key: "DELTA_EMOJI_THRESH",
                value: "NaN",
            },
            TestCase {
                // TC5: zero entry cap
                key: "LINES_PER_MESSAGE",
                value: "0",
            },
            TestCase {
                // TC6: unknown session timeframe
                key: "TIMEFRAME",
                value: "2m",
            },
            TestCase {
                // TC7: unknown trend timeframe
                key: "TREND_TIMEFRAME",
                value: "2m",
            },
            TestCase {
                // TC8: offset beyond any real timezone
                key: "UTC_OFFSET_HOURS",
                value: "15",
            },
            TestCase {
                // TC9: unknown trend mode
                key: "TREND_MODE",
                value: "smooth",
            },
            TestCase {
                // TC10: zero concurrency
                key: "CONCURRENCY",
                value: "0",
            },
            TestCase {
                // TC11: zero session fetch limit
                key: "SESSION_FETCH_LIMIT",
                value: "0",
            },
            TestCase {
                // TC12: zero trend fetch limit
                key: "TREND_FETCH_LIMIT",
                value: "0",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = RankerConfig::from_vars([(test.key, test.value)]);
            assert!(
                matches!(&actual, Err(ConfigError::Invalid { key, .. }) if key == test.key),
                "TC{} failed: {:?}",
                index,
                actual
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_utf8_vars() {
        use std::os::unix::ffi::OsStringExt;

        let os = |text: &str| OsString::from(text);
        let non_utf8 = || OsString::from_vec(vec![0xff, 0xfe]);

        // Unrelated non-UTF-8 pairs are skipped
        let vars = utf8_vars([
            (os("TOP_N"), os("5")),
            (os("UNRELATED"), non_utf8()),
            (non_utf8(), os("1")),
        ])
        .unwrap();
        assert_eq!(vars, vec![("TOP_N".to_string(), "5".to_string())]);
        assert_eq!(RankerConfig::from_vars(vars).unwrap().depth, Some(5));

        // A non-UTF-8 value under a recognised key is invalid
        let error = utf8_vars([(os("TREND_MODE"), non_utf8())]).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key, .. } if key == "TREND_MODE"));

        assert!(matches!(
            utf8_value("CANDLES_DIR", non_utf8()),
            Err(ConfigError::Invalid { key, .. }) if key == "CANDLES_DIR"
        ));
        assert_eq!(utf8_value("CANDLES_DIR", os("/data")).unwrap(), "/data");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("on"));
    }
}
