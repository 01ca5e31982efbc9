//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction scope; repositories never open transactions.
//! - Check caller identity and ownership before touching the store.
//!
//! # Invariants
//! - The caller identity is always an explicit parameter.
//! - Validation failures are raised before any transaction is opened.

pub mod announcement_service;
pub mod conference_service;
pub mod error;
pub mod profile_service;
pub mod registration_service;

pub use error::{ConferenceError, ErrorKind};

use crate::identity::Identity;

pub type ServiceResult<T> = Result<T, ConferenceError>;

/// Returns the caller, or `Unauthenticated` when there is none.
pub(crate) fn require_identity(caller: Option<&Identity>) -> ServiceResult<&Identity> {
    caller.ok_or(ConferenceError::Unauthenticated)
}
