//! SQLite storage bootstrap, schema migrations and transaction runner.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the conference store.
//! - Apply schema migrations in deterministic order.
//! - Run closures inside bounded-retry write transactions.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Busy/locked contention is never retried without bound.

use rusqlite::ErrorCode;

pub mod migrations;
mod open;
mod transaction;

pub use open::{open_db, open_db_in_memory, open_db_with_busy_timeout, DEFAULT_BUSY_TIMEOUT};
pub use transaction::{is_contention, run_in_transaction, RetryPolicy, TransactionFailure};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Returns whether this error is lock contention another writer caused.
    pub fn is_contention(&self) -> bool {
        match self {
            Self::Sqlite(err) => is_contention(err),
            Self::UnsupportedSchemaVersion { .. } => false,
        }
    }

    /// Returns whether retrying later may succeed: contention, or a store
    /// that could not be opened or written to.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
            ),
            _ => false,
        }
    }
}
