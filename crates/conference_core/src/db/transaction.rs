//! Bounded-retry write transactions.
//!
//! # Responsibility
//! - Run a closure inside one `BEGIN IMMEDIATE` transaction.
//! - Retry the whole closure when another writer holds the lock.
//!
//! # Invariants
//! - The closure's writes commit together or not at all.
//! - An `Err` from the closure rolls the transaction back.
//! - At most `RetryPolicy::max_attempts` attempts are made.

use log::warn;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::thread;
use std::time::Duration;

/// Retry budget for contended write transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(20),
        }
    }
}

/// Error contract for closures run by [`run_in_transaction`].
pub trait TransactionFailure: From<rusqlite::Error> {
    /// Returns whether the failure was lock contention and may be retried.
    fn is_contention(&self) -> bool;

    /// Converts a contention failure into the caller-facing error once the
    /// retry budget is spent.
    fn retries_exhausted(self, attempts: u32) -> Self;
}

/// Returns whether a SQLite error is busy/locked contention.
pub fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Runs `body` inside an immediate write transaction with bounded retry.
///
/// `BEGIN IMMEDIATE` takes the database write lock up front, so every read the
/// closure makes is consistent with the writes it commits. Concurrent callers
/// serialize on that lock; a caller that cannot obtain it within the
/// connection busy timeout retries the whole closure.
///
/// # Errors
/// - Returns the closure's error unchanged when it is not contention.
/// - Returns `E::retries_exhausted` when every attempt hit contention.
pub fn run_in_transaction<T, E, F>(conn: &Connection, policy: &RetryPolicy, mut body: F) -> Result<T, E>
where
    E: TransactionFailure,
    F: FnMut(&Transaction<'_>) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match attempt_once(conn, &mut body) {
            Err(err) if err.is_contention() => {
                if attempt >= max_attempts {
                    warn!(
                        "event=transaction_retry module=db status=error attempts={} error_code=retry_budget_exhausted",
                        attempt
                    );
                    return Err(err.retries_exhausted(attempt));
                }
                warn!(
                    "event=transaction_retry module=db status=retry attempt={} max_attempts={}",
                    attempt, max_attempts
                );
                thread::sleep(policy.backoff * attempt);
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn attempt_once<T, E, F>(conn: &Connection, body: &mut F) -> Result<T, E>
where
    E: TransactionFailure,
    F: FnMut(&Transaction<'_>) -> Result<T, E>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = body(&tx)?;
    tx.commit()?;
    Ok(value)
}
