use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration errors. Raised before any candle is fetched.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid configuration {key}={value:?}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unparsable watch-list: {0}")]
    Watchlist(String),

    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors generated by a [`CandleSource`](crate::source::CandleSource).
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum SourceError {
    #[error("candle source unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },
}

/// Errors generated by a [`MessageSink`](crate::sink::MessageSink).
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum SinkError {
    #[error("message delivery failed: {0}")]
    Delivery(String),
}

/// Reason a symbol is left out of a run.
///
/// Never a run failure: the engine logs it and moves on to the next symbol.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum SkipReason {
    #[error("insufficient data: {candles} candle(s) inside the session window")]
    InsufficientData { candles: usize },

    #[error("candle source returned no candles")]
    NoCandles,

    #[error("no completed resampling step since the base instant")]
    NoCompletedSteps,

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("source call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

impl SkipReason {
    /// Determine if the skip came from the venue rather than from the data itself.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_source_failure(&self) -> bool {
        match self {
            SkipReason::SourceUnavailable(_) | SkipReason::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<SourceError> for SkipReason {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::Unavailable { reason, .. } => Self::SourceUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_is_source_failure() {
        struct TestCase {
            input: SkipReason,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: source failure w/ SkipReason::SourceUnavailable
                input: SkipReason::from(SourceError::Unavailable {
                    symbol: "BTC_USDT".to_string(),
                    reason: "HTTP error: 503".to_string(),
                }),
                expected: true,
            },
            TestCase {
                // TC1: source failure w/ SkipReason::Timeout
                input: SkipReason::Timeout { after_ms: 20_000 },
                expected: true,
            },
            TestCase {
                // TC2: data insufficiency is not a source failure
                input: SkipReason::InsufficientData { candles: 1 },
                expected: false,
            },
            TestCase {
                // TC3: zero completed steps is not a source failure
                input: SkipReason::NoCompletedSteps,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_source_failure();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_source_error_keeps_reason() {
        let skip = SkipReason::from(SourceError::Unavailable {
            symbol: "ETH_USDT".to_string(),
            reason: "connection reset".to_string(),
        });
        assert_eq!(skip, SkipReason::SourceUnavailable("connection reset".to_string()));
    }
}
