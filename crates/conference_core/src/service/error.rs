//! Service-level error taxonomy.
//!
//! # Invariants
//! - Business-rule rejections never carry a storage error.
//! - Contention that outlives the retry budget surfaces as `Transient`.

use crate::cache::CacheError;
use crate::db::TransactionFailure;
use crate::model::conference::ConferenceValidationError;
use crate::model::key::InvalidConferenceKey;
use crate::query::filter::FilterError;
use crate::repo::RepoError;

/// Coarse classification used by hosts to map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    NotFound,
    Forbidden,
    Conflict,
    Transient,
    Internal,
}

/// Errors returned by every public conference operation.
#[derive(Debug, thiserror::Error)]
pub enum ConferenceError {
    #[error("authorization required")]
    Unauthenticated,
    #[error(transparent)]
    InvalidConferenceKey(#[from] InvalidConferenceKey),
    #[error("no conference found with key: {0}")]
    ConferenceNotFound(String),
    #[error("only the owner can update the conference")]
    NotOwner,
    #[error(transparent)]
    Validation(#[from] ConferenceValidationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("you have already registered for this conference")]
    AlreadyRegistered,
    #[error("there are no seats available")]
    NoSeatsAvailable,
    #[error("store busy after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: RepoError,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ConferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::InvalidConferenceKey(_) | Self::Filter(_) => ErrorKind::Validation,
            Self::Validation(ConferenceValidationError::CapacityBelowRegistrations { .. }) => {
                ErrorKind::Conflict
            }
            Self::Validation(_) => ErrorKind::Validation,
            Self::ConferenceNotFound(_) => ErrorKind::NotFound,
            Self::NotOwner => ErrorKind::Forbidden,
            Self::AlreadyRegistered | Self::NoSeatsAvailable => ErrorKind::Conflict,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Repo(err) if err.is_transient() => ErrorKind::Transient,
            Self::Repo(_) | Self::Cache(_) => ErrorKind::Internal,
        }
    }

    /// Only transient failures may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<rusqlite::Error> for ConferenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl TransactionFailure for ConferenceError {
    fn is_contention(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_contention())
    }

    fn retries_exhausted(self, attempts: u32) -> Self {
        match self {
            Self::Repo(source) => Self::Transient { attempts, source },
            other => other,
        }
    }
}
