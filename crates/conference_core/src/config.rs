//! Runtime configuration loaded from environment variables.
//!
//! Every field has a default, so an empty environment yields a working
//! configuration backed by `conference_central.sqlite3` in the working
//! directory.

use crate::db::RetryPolicy;
use crate::logging::default_log_level;
use crate::service::conference_service::DEFAULT_QUERY_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "conference_central.sqlite3";

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// SQLite database file path.
    pub db_path: String,
    /// Log level: trace, debug, info, warn or error.
    pub log_level: String,
    /// Absolute log directory; file logging stays off when unset.
    pub log_dir: Option<String>,
    /// How long a connection waits on a held write lock.
    pub busy_timeout_ms: u64,
    /// Attempts per write transaction, including the first.
    pub tx_max_attempts: u32,
    /// Base backoff between transaction attempts.
    pub tx_backoff_ms: u64,
    /// Rows fetched per page by conference queries.
    pub query_page_size: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: 5_000,
            tx_max_attempts: retry.max_attempts,
            tx_backoff_ms: u64::try_from(retry.backoff.as_millis()).unwrap_or(20),
            query_page_size: DEFAULT_QUERY_PAGE_SIZE,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from `CONFERENCE_*` environment variables.
    ///
    /// Unset or unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            db_path: text("CONFERENCE_DB_PATH").unwrap_or(defaults.db_path),
            log_level: text("CONFERENCE_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: text("CONFERENCE_LOG_DIR"),
            busy_timeout_ms: text("CONFERENCE_BUSY_TIMEOUT_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(defaults.busy_timeout_ms),
            tx_max_attempts: text("CONFERENCE_TX_MAX_ATTEMPTS")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.tx_max_attempts),
            tx_backoff_ms: text("CONFERENCE_TX_BACKOFF_MS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(defaults.tx_backoff_ms),
            query_page_size: text("CONFERENCE_QUERY_PAGE_SIZE")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.query_page_size),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.tx_max_attempts,
            backoff: Duration::from_millis(self.tx_backoff_ms),
        }
    }
}
