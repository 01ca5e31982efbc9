//! Entity store adapter: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define get/get-multi/put/allocate/query contracts per entity kind.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories never open transactions; services decide transaction scope
//!   and hand repositories a connection or an open transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;

pub mod conference_repo;
pub mod profile_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this error is write-lock contention.
    pub fn is_contention(&self) -> bool {
        match self {
            Self::Db(err) => err.is_contention(),
            _ => false,
        }
    }

    /// Returns whether the failure is worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
