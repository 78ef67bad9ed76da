//! Runtime configuration read from the environment.
use std::env;

use tracing::warn;

use crate::words::VoteWords;

/// Default size of the PostgreSQL connection pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable console output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse the log format from `BALLOT_LOG_FORMAT`.
    ///
    /// Valid values: "json" or "pretty" (case-insensitive).
    /// Defaults to "pretty" if not set or invalid.
    fn from_env() -> Self {
        match env::var("BALLOT_LOG_FORMAT") {
            Err(_) => Self::Pretty,
            Ok(value) => match value.trim().to_lowercase().as_str() {
                "json" => Self::Json,
                "pretty" | "" => Self::Pretty,
                _ => {
                    warn!(value = %value, "Invalid BALLOT_LOG_FORMAT, defaulting to 'pretty'");
                    Self::Pretty
                }
            },
        }
    }
}

/// Settings shared by the library and the `ballot` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotConfig {
    /// PostgreSQL connection string. Only the binary requires it.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Replacement for the built-in down-word set, if configured.
    pub down_words: Option<Vec<String>>,
    pub log_format: LogFormat,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            down_words: None,
            log_format: LogFormat::default(),
        }
    }
}

impl BallotConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (no default)
    /// - `BALLOT_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `BALLOT_DOWN_WORDS`: comma-separated down-word tokens (default: built-in set)
    /// - `BALLOT_LOG_FORMAT`: "json" or "pretty" (default: pretty)
    ///
    /// Invalid values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let max_connections = match env::var("BALLOT_MAX_CONNECTIONS") {
            Err(_) => DEFAULT_MAX_CONNECTIONS,
            Ok(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(
                        value = %value,
                        default = DEFAULT_MAX_CONNECTIONS,
                        "Invalid BALLOT_MAX_CONNECTIONS, using default"
                    );
                    DEFAULT_MAX_CONNECTIONS
                }
            },
        };

        let down_words = env::var("BALLOT_DOWN_WORDS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|word| word.trim().to_string())
                    .filter(|word| !word.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty());

        Self {
            database_url,
            max_connections,
            down_words,
            log_format: LogFormat::from_env(),
        }
    }

    /// Builds the word interpreter for this configuration.
    pub fn vote_words(&self) -> VoteWords {
        match &self.down_words {
            Some(words) => VoteWords::new(words),
            None => VoteWords::default(),
        }
    }
}
