use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered instrument identifiers, already resolved to source symbols.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a JSON array of symbols. Non-string and blank entries are skipped, the rest
    /// are trimmed; anything other than an array is a [`ConfigError::Watchlist`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|error| ConfigError::Watchlist(error.to_string()))?;

        let entries = value
            .as_array()
            .ok_or_else(|| ConfigError::Watchlist("expected a JSON array of symbols".to_string()))?;

        Ok(Self {
            symbols: entries
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|symbol| !symbol.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            reason: error.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
