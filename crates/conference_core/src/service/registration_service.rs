//! Registration engine.
//!
//! # Responsibility
//! - Register and unregister the caller for one conference.
//!
//! # Invariants
//! - Profile membership and the conference seat counter change in the same
//!   write transaction, or neither changes.
//! - `seats_available` never drops below zero and a key never appears twice
//!   in `conference_keys_to_attend`.
//! - Unregistering when not registered returns `false` and writes nothing
//!   beyond first-access profile creation.

use crate::db::{run_in_transaction, RetryPolicy};
use crate::identity::Identity;
use crate::model::key::ConferenceKey;
use crate::repo::conference_repo::{ConferenceRepository, SqliteConferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::profile_service::load_or_create_profile;
use crate::service::{require_identity, ConferenceError, ServiceResult};
use log::info;
use rusqlite::Connection;

/// Registration service over the SQLite store.
pub struct RegistrationService<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
}

impl<'conn> RegistrationService<'conn> {
    pub fn new(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    /// Sets the caller's registration state for one conference.
    ///
    /// Returns `true` when state changed, `false` for an unregistration of a
    /// conference the caller never registered for.
    ///
    /// # Errors
    /// - `Unauthenticated`, `InvalidConferenceKey` before any store access.
    /// - `ConferenceNotFound` when the key does not resolve.
    /// - `AlreadyRegistered` / `NoSeatsAvailable` for rejected registrations.
    /// - `Transient` when the write lock stays contended past the retry budget.
    pub fn set_registration(
        &self,
        caller: Option<&Identity>,
        websafe_key: &str,
        want_registered: bool,
    ) -> ServiceResult<bool> {
        let identity = require_identity(caller)?;
        let key = ConferenceKey::from_websafe(websafe_key)?;

        let result: ServiceResult<(bool, u32)> = run_in_transaction(self.conn, &self.retry, |tx| {
            let mut profile = load_or_create_profile(tx, identity)?;
            let conference_repo = SqliteConferenceRepository::new(tx);
            let mut conference = conference_repo
                .get_conference(&key)?
                .ok_or_else(|| ConferenceError::ConferenceNotFound(websafe_key.to_string()))?;

            if want_registered {
                if profile.is_attending(&key) {
                    return Err(ConferenceError::AlreadyRegistered);
                }
                if !conference.take_seat() {
                    return Err(ConferenceError::NoSeatsAvailable);
                }
                profile.add_attendance(&key);
            } else {
                if !profile.remove_attendance(&key) {
                    return Ok((false, conference.seats_available));
                }
                conference.release_seat();
            }

            SqliteProfileRepository::new(tx).put_profile(&profile)?;
            conference_repo.put_conference(&conference)?;
            Ok((true, conference.seats_available))
        });

        let action = if want_registered { "register" } else { "unregister" };
        match &result {
            Ok((changed, seats_available)) => info!(
                "event=registration module=service status=ok action={} conference_id={} changed={} seats_available={}",
                action,
                key.id(),
                changed,
                seats_available
            ),
            Err(err) => info!(
                "event=registration module=service status=rejected action={} conference_id={} error_kind={:?}",
                action,
                key.id(),
                err.kind()
            ),
        }
        result.map(|(changed, _)| changed)
    }

    /// Registers the caller for one conference.
    pub fn register(&self, caller: Option<&Identity>, websafe_key: &str) -> ServiceResult<bool> {
        self.set_registration(caller, websafe_key, true)
    }

    /// Unregisters the caller from one conference.
    pub fn unregister(&self, caller: Option<&Identity>, websafe_key: &str) -> ServiceResult<bool> {
        self.set_registration(caller, websafe_key, false)
    }
}
