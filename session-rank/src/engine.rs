//! Ranking run: fetch, evaluate, resample and deliver for every watch-list symbol.
//!
//! Symbols are independent. Every failure below the configuration level is a per-symbol
//! [`SkipReason`], logged where it happens, and never aborts the run.

use crate::{
    candle::{Candle, Timeframe},
    clock::SessionWindow,
    config::{RankerConfig, TrendMode},
    error::SkipReason,
    limiter::RateLimiter,
    performance::{PerformanceResult, evaluate_session},
    report::{RankedReport, Trend, chunk_messages, rank},
    resample::{resample_boundaries, resample_buckets},
    series::{interval_deltas, interval_ranges, trailing},
    sink::MessageSink,
    source::CandleSource,
    watchlist::Watchlist,
};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use futures::StreamExt;
use tracing::{debug, info, warn};

/// Messages handed to the sink during one delivery.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Constructor)]
pub struct DeliverySummary {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug)]
struct SymbolOutcome {
    /// Watch-list position, restores input order after unordered collection.
    index: usize,
    symbol: String,
    performance: Result<PerformanceResult, SkipReason>,
    trend: Trend,
}

/// Runs the session ranking against a [`CandleSource`].
#[derive(Debug)]
pub struct Ranker<Source> {
    config: RankerConfig,
    source: Source,
    limiter: RateLimiter,
}

impl<Source> Ranker<Source>
where
    Source: CandleSource,
{
    pub fn new(config: RankerConfig, source: Source) -> Self {
        let limiter =
            RateLimiter::from_advertised(source.rate_limit(), config.min_request_interval);
        Self {
            config,
            source,
            limiter,
        }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank every watch-list symbol by its previous-session performance at `now`.
    ///
    /// Ranking starts only once every symbol has finished or been abandoned.
    pub async fn run(&self, watchlist: &Watchlist, now: DateTime<Utc>) -> RankedReport {
        let clock = self.config.clock();
        let window = clock.previous_session(now);
        let base = clock.latest_boundary_at_or_before(now, self.config.anchor_hour);
        let now_ms = now.timestamp_millis();

        info!(
            symbols = watchlist.len(),
            session = %clock.local_date_label(window.start),
            concurrency = self.config.concurrency,
            request_interval_ms = self.limiter.interval().as_millis() as u64,
            "starting session ranking run"
        );

        let mut outcomes: Vec<SymbolOutcome> =
            futures::stream::iter(watchlist.symbols().iter().enumerate())
                .map(|(index, symbol)| self.process_symbol(index, symbol, &window, base, now_ms))
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|outcome| outcome.index);

        let mut ranked = Vec::with_capacity(outcomes.len());
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome.performance {
                Ok(result) => ranked.push((result, outcome.trend)),
                Err(reason) => {
                    skipped += 1;
                    if reason.is_source_failure() {
                        warn!(symbol = %outcome.symbol, %reason, "symbol dropped from ranking");
                    } else {
                        debug!(symbol = %outcome.symbol, %reason, "symbol dropped from ranking");
                    }
                }
            }
        }

        let entries = rank(ranked, self.config.depth);
        info!(ranked = entries.len(), skipped, "session ranking complete");

        RankedReport { window, entries }
    }

    /// Render `report` into size-bounded messages, each starting with the same header.
    pub fn messages(&self, report: &RankedReport, now: DateTime<Utc>) -> Vec<String> {
        let formatter = self.config.formatter();
        let header = formatter.header(&report.window);
        let entries = report
            .entries
            .iter()
            .map(|entry| formatter.entry(entry, now));

        chunk_messages(&header, entries, self.config.limits)
    }

    /// Send every message of `report` in order. Failures are logged, never retried.
    pub async fn deliver<Sink>(
        &self,
        report: &RankedReport,
        sink: &Sink,
        now: DateTime<Utc>,
    ) -> DeliverySummary
    where
        Sink: MessageSink + ?Sized,
    {
        let messages = self.messages(report, now);
        if messages.is_empty() {
            info!("no ranked symbols, nothing to deliver");
            return DeliverySummary::default();
        }

        let mut summary = DeliverySummary::default();
        for (index, message) in messages.iter().enumerate() {
            match sink.send(message).await {
                Ok(()) => summary.sent += 1,
                Err(error) => {
                    summary.failed += 1;
                    warn!(
                        message = index + 1,
                        total = messages.len(),
                        %error,
                        "message delivery failed"
                    );
                }
            }
        }

        info!(sent = summary.sent, failed = summary.failed, "report delivered");
        summary
    }

    async fn process_symbol(
        &self,
        index: usize,
        symbol: &str,
        window: &SessionWindow,
        base: i64,
        now_ms: i64,
    ) -> SymbolOutcome {
        let performance = self.session_performance(symbol, window).await;

        // A symbol out of the ranking needs no trend
        let trend = match &performance {
            Ok(_) => self.trend(symbol, base, now_ms).await.unwrap_or_else(|reason| {
                if reason.is_source_failure() {
                    warn!(%symbol, %reason, "trend unavailable");
                } else {
                    debug!(%symbol, %reason, "trend unavailable");
                }
                self.empty_trend()
            }),
            Err(_) => self.empty_trend(),
        };

        SymbolOutcome {
            index,
            symbol: symbol.to_string(),
            performance,
            trend,
        }
    }

    async fn session_performance(
        &self,
        symbol: &str,
        window: &SessionWindow,
    ) -> Result<PerformanceResult, SkipReason> {
        let candles = self
            .fetch(
                symbol,
                self.config.session_timeframe,
                window.start,
                self.config.session_fetch_limit,
            )
            .await?;

        evaluate_session(symbol, &candles, window)
    }

    async fn trend(&self, symbol: &str, base: i64, now_ms: i64) -> Result<Trend, SkipReason> {
        let candles = self
            .fetch(
                symbol,
                self.config.trend_timeframe,
                base,
                self.config.trend_fetch_limit,
            )
            .await?;

        let step_ms = self.config.step_ms();
        let count = self.config.trend_count;

        match self.config.trend_mode {
            TrendMode::Boundary => {
                let grid = resample_boundaries(&candles, base, step_ms, now_ms)?;
                let deltas = interval_deltas(&grid);
                Ok(Trend::new(trailing(&deltas, count).to_vec(), None))
            }
            TrendMode::Bucketed => {
                let buckets = resample_buckets(&candles, base, step_ms, now_ms)?;
                let deltas = interval_deltas(&buckets.boundary_grid());
                let ranges = interval_ranges(&buckets);
                Ok(Trend::new(
                    trailing(&deltas, count).to_vec(),
                    Some(trailing(&ranges, count).to_vec()),
                ))
            }
        }
    }

    fn empty_trend(&self) -> Trend {
        Trend::new(
            Vec::new(),
            (self.config.trend_mode == TrendMode::Bucketed).then(Vec::new),
        )
    }

    /// One rate-limited, time-bounded source call.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, SkipReason> {
        self.limiter.acquire().await;

        let timeout = self.config.symbol_timeout;
        let call = self.source.fetch(symbol, timeframe, since, limit);
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.map_err(SkipReason::from),
            Err(_elapsed) => Err(SkipReason::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
