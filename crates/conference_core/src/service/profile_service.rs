//! Profile use-case service.
//!
//! # Responsibility
//! - Resolve the caller's profile, creating it on first access.
//! - Apply user edits to display name and tee-shirt size.
//!
//! # Invariants
//! - A profile is created at most once per identity; creation runs inside a
//!   write transaction so a concurrent writer never sees it half-built.
//! - `save_profile` never touches `conference_keys_to_attend` or the email.

use crate::db::{run_in_transaction, RetryPolicy};
use crate::identity::Identity;
use crate::model::forms::ProfileMiniForm;
use crate::model::profile::Profile;
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::{require_identity, ConferenceError, ServiceResult};
use log::info;
use rusqlite::Connection;

/// Profile service facade over the SQLite store.
pub struct ProfileService<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
}

impl<'conn> ProfileService<'conn> {
    pub fn new(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    /// Returns the caller's profile, creating it on first access.
    pub fn get_profile(&self, caller: Option<&Identity>) -> ServiceResult<Profile> {
        let identity = require_identity(caller)?;
        if let Some(profile) = SqliteProfileRepository::new(self.conn).get_profile(&identity.user_id)? {
            return Ok(profile);
        }
        run_in_transaction(self.conn, &self.retry, |tx| load_or_create_profile(tx, identity))
    }

    /// Applies the non-empty fields of `form` to the caller's profile.
    pub fn save_profile(
        &self,
        caller: Option<&Identity>,
        form: &ProfileMiniForm,
    ) -> ServiceResult<Profile> {
        let identity = require_identity(caller)?;
        let display_name = form
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());

        run_in_transaction(self.conn, &self.retry, |tx| {
            let mut profile = load_or_create_profile(tx, identity)?;
            if let Some(name) = display_name {
                profile.display_name = name.to_string();
            }
            if let Some(size) = form.tee_shirt_size {
                profile.tee_shirt_size = size;
            }
            SqliteProfileRepository::new(tx).put_profile(&profile)?;
            info!(
                "event=profile_saved module=service status=ok display_name_changed={} tee_shirt_size={}",
                display_name.is_some(),
                profile.tee_shirt_size
            );
            Ok::<_, ConferenceError>(profile)
        })
    }
}

/// Loads the identity's profile, persisting a fresh one when missing.
///
/// Run this on an open transaction when the result feeds further writes.
pub(crate) fn load_or_create_profile(conn: &Connection, identity: &Identity) -> ServiceResult<Profile> {
    let repo = SqliteProfileRepository::new(conn);
    if let Some(profile) = repo.get_profile(&identity.user_id)? {
        return Ok(profile);
    }

    let profile = Profile::for_identity(identity);
    repo.put_profile(&profile)?;
    info!("event=profile_created module=service status=ok");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::ProfileService;
    use crate::db::{open_db_in_memory, RetryPolicy};
    use crate::identity::Identity;
    use crate::model::forms::ProfileMiniForm;
    use crate::model::profile::TeeShirtSize;
    use crate::service::ConferenceError;

    #[test]
    fn anonymous_caller_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let service = ProfileService::new(&conn, RetryPolicy::default());
        assert!(matches!(
            service.get_profile(None),
            Err(ConferenceError::Unauthenticated)
        ));
    }

    #[test]
    fn blank_display_name_is_ignored() {
        let conn = open_db_in_memory().unwrap();
        let service = ProfileService::new(&conn, RetryPolicy::default());
        let identity = Identity::new("u-1", "Ada", "ada@example.com");

        let saved = service
            .save_profile(
                Some(&identity),
                &ProfileMiniForm {
                    display_name: Some("   ".to_string()),
                    tee_shirt_size: Some(TeeShirtSize::LW),
                },
            )
            .unwrap();
        assert_eq!(saved.display_name, "Ada");
        assert_eq!(saved.tee_shirt_size, TeeShirtSize::LW);
    }
}
