#![forbid(unsafe_code)]

//! # Session Rank
//! Ranks a watch-list of perpetual futures by their previous-session performance and
//! reports short-horizon momentum for each ranked symbol.
//!
//! A run:
//! 1. Derives the previous 24h session from a fixed-offset local calendar ([`clock`]).
//! 2. Fetches fine candles per symbol through a rate-limited [`CandleSource`].
//! 3. Evaluates the session low and the highest high at or after it ([`performance`]).
//! 4. Resamples a second fetch onto a fixed boundary grid and derives trailing
//!    interval deltas, plus intrabar ranges in bucketed mode ([`resample`], [`series`]).
//! 5. Ranks by performance and packs the rendered entries into size-bounded messages
//!    handed to a [`MessageSink`] ([`report`]).
//!
//! Per-symbol failures never abort a run: the symbol is skipped with a [`SkipReason`].

/// Candle model, timeframes and bucket aggregation.
pub mod candle;

/// Session windows and resampling boundaries.
pub mod clock;

/// [`RankerConfig`] and its key/value loader.
pub mod config;

/// [`Ranker`] orchestrating fetch, evaluation, ranking and delivery.
pub mod engine;

/// Configuration, source, sink and per-symbol skip errors.
pub mod error;

pub mod limiter;
pub mod performance;
pub mod report;
pub mod resample;
pub mod series;
pub mod sink;
pub mod source;
pub mod watchlist;

pub use candle::{Candle, CandleBucket, Timeframe};
pub use clock::{SessionClock, SessionWindow};
pub use config::{RankerConfig, TrendMode};
pub use engine::{DeliverySummary, Ranker};
pub use error::{ConfigError, SinkError, SkipReason, SourceError};
pub use performance::{PerformanceResult, evaluate_session};
pub use report::{MessageLimits, RankedEntry, RankedReport, ReportFormatter, TrendLayout};
pub use sink::{MessageSink, RecordingSink, StdoutSink};
pub use source::{CandleSource, SnapshotSource};
pub use watchlist::Watchlist;
