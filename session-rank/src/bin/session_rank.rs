use chrono::{DateTime, Utc};
use session_rank::{
    ConfigError, Ranker, RankerConfig, SnapshotSource, StdoutSink, Watchlist,
    config::{utf8_value, utf8_vars},
    source::DEFAULT_RATE_LIMIT,
};
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_WATCHLIST_PATH: &str = "watchlist.json";

/// Replay inputs that only the binary reads.
#[derive(Debug)]
struct ReplayArgs {
    watchlist_path: String,
    candles_dir: String,
    now: DateTime<Utc>,
}

impl ReplayArgs {
    fn from_env() -> Result<Self, ConfigError> {
        let watchlist_path = env_var("WATCHLIST_PATH")?
            .unwrap_or_else(|| DEFAULT_WATCHLIST_PATH.to_string());

        let candles_dir = env_var("CANDLES_DIR")?
            .ok_or_else(|| ConfigError::Missing("CANDLES_DIR".to_string()))?;

        let now = match env_var("RANK_NOW")? {
            Some(value) => DateTime::parse_from_rfc3339(value.trim())
                .map(|now| now.with_timezone(&Utc))
                .map_err(|error| ConfigError::invalid("RANK_NOW", &value, error.to_string()))?,
            None => Utc::now(),
        };

        Ok(Self {
            watchlist_path,
            candles_dir,
            now,
        })
    }
}

/// Unset is `None`; set but not UTF-8 is a [`ConfigError::Invalid`].
fn env_var(key: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(key)
        .map(|value| utf8_value(key, value))
        .transpose()
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "session ranking aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ConfigError> {
    let config = RankerConfig::from_vars(utf8_vars(std::env::vars_os())?)?;
    let args = ReplayArgs::from_env()?;
    let watchlist = Watchlist::load(&args.watchlist_path)?;

    info!(
        watchlist = %args.watchlist_path,
        symbols = watchlist.len(),
        candles_dir = %args.candles_dir,
        now = %args.now,
        "replaying session ranking"
    );

    let source = SnapshotSource::new(&args.candles_dir).with_rate_limit(DEFAULT_RATE_LIMIT);
    let ranker = Ranker::new(config, source);

    let report = ranker.run(&watchlist, args.now).await;
    ranker.deliver(&report, &StdoutSink, args.now).await;

    Ok(())
}

/// Logs go to stderr so stdout carries only the report. `LOG_FORMAT=json` switches to
/// JSON lines.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var_os("LOG_FORMAT").is_some_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
