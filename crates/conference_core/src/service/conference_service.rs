//! Conference lifecycle and browsing service.
//!
//! # Responsibility
//! - Create conferences under the caller's profile and notify the organizer.
//! - Apply owner-only sparse updates inside a write transaction.
//! - Serve single lookups, filtered queries and per-profile listings.
//!
//! # Invariants
//! - Create/update inputs are validated before any transaction is opened.
//! - Only the organizer may update a conference; a rejected update writes
//!   nothing.
//! - Notification enqueue is best-effort and never undoes a creation.
//! - Browse reads run outside transactions and may observe concurrent writes.

use crate::db::{run_in_transaction, RetryPolicy};
use crate::identity::Identity;
use crate::model::conference::Conference;
use crate::model::forms::{ConferenceForm, ConferenceForms};
use crate::model::key::{ConferenceKey, UserId};
use crate::query::conference_query::ConferenceQuery;
use crate::query::filter::RawFilter;
use crate::repo::conference_repo::{
    ConferenceRepository, ConferenceStream, SqliteConferenceRepository,
};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::service::profile_service::load_or_create_profile;
use crate::service::{require_identity, ConferenceError, ServiceResult};
use crate::tasks::{ConfirmationEmail, Task, TaskDispatcher};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::HashMap;

pub const DEFAULT_QUERY_PAGE_SIZE: u32 = 50;

/// Lazy conference sequence returned by browse operations.
pub type ConferenceResults<'conn> = ConferenceStream<SqliteConferenceRepository<'conn>>;

/// Conference service facade over the SQLite store.
pub struct ConferenceService<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
    page_size: u32,
}

impl<'conn> ConferenceService<'conn> {
    pub fn new(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self {
            conn,
            retry,
            page_size: DEFAULT_QUERY_PAGE_SIZE,
        }
    }

    /// Overrides how many rows each query page fetches.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Creates one conference organized by the caller.
    ///
    /// # Errors
    /// - `Unauthenticated` without a caller.
    /// - `Validation` for a missing name or unparseable dates.
    pub fn create_conference(
        &self,
        caller: Option<&Identity>,
        form: &ConferenceForm,
        dispatcher: &dyn TaskDispatcher,
    ) -> ServiceResult<Conference> {
        let identity = require_identity(caller)?;
        let draft = form.to_draft()?;

        let conference = run_in_transaction(self.conn, &self.retry, |tx| {
            load_or_create_profile(tx, identity)?;
            let repo = SqliteConferenceRepository::new(tx);
            let key = repo.allocate_conference_key(&identity.user_id)?;
            let conference = Conference::from_draft(key, draft.clone());
            repo.put_conference(&conference)?;
            Ok::<_, ConferenceError>(conference)
        })?;

        info!(
            "event=conference_created module=service status=ok conference_id={} max_attendees={} topics={}",
            conference.key.id(),
            conference.max_attendees,
            conference.topics.len()
        );
        self.notify_organizer(identity, &conference, dispatcher);
        Ok(conference)
    }

    /// Applies the non-empty fields of `form` to a conference the caller owns.
    ///
    /// # Errors
    /// - `Unauthenticated`, `InvalidConferenceKey` or `Validation` before any
    ///   store access.
    /// - `ConferenceNotFound` / `NotOwner` from inside the transaction.
    /// - `Validation(CapacityBelowRegistrations)` when shrinking below the
    ///   current registration count.
    pub fn update_conference(
        &self,
        caller: Option<&Identity>,
        websafe_key: &str,
        form: &ConferenceForm,
    ) -> ServiceResult<Conference> {
        let identity = require_identity(caller)?;
        let key = ConferenceKey::from_websafe(websafe_key)?;
        let patch = form.to_patch()?;

        let updated: ServiceResult<Conference> = run_in_transaction(self.conn, &self.retry, |tx| {
            let repo = SqliteConferenceRepository::new(tx);
            let mut conference = repo
                .get_conference(&key)?
                .ok_or_else(|| ConferenceError::ConferenceNotFound(websafe_key.to_string()))?;
            if conference.organizer_user_id != identity.user_id {
                return Err(ConferenceError::NotOwner);
            }
            conference.apply_patch(&patch)?;
            repo.put_conference(&conference)?;
            Ok(conference)
        });

        match &updated {
            Ok(conference) => info!(
                "event=conference_updated module=service status=ok conference_id={} seats_available={}",
                conference.key.id(),
                conference.seats_available
            ),
            Err(err) => warn!(
                "event=conference_updated module=service status=rejected conference_id={} error_kind={:?}",
                key.id(),
                err.kind()
            ),
        }
        updated
    }

    /// Looks one conference up by websafe key.
    pub fn get_conference(&self, websafe_key: &str) -> ServiceResult<Conference> {
        let key = ConferenceKey::from_websafe(websafe_key)?;
        SqliteConferenceRepository::new(self.conn)
            .get_conference(&key)?
            .ok_or_else(|| ConferenceError::ConferenceNotFound(websafe_key.to_string()))
    }

    /// Compiles client filters and returns the lazy result sequence.
    ///
    /// # Errors
    /// - `Filter` when compilation fails; no query is executed then.
    pub fn query_conferences(&self, filters: &[RawFilter]) -> ServiceResult<ConferenceResults<'conn>> {
        let query = ConferenceQuery::compile(filters)?;
        info!(
            "event=conference_query module=service status=ok filters={} inequality={}",
            query.filters.len(),
            query.order.len() > 1
        );
        Ok(self.stream(query))
    }

    /// Conferences organized by the caller, in creation order.
    pub fn get_conferences_created(
        &self,
        caller: Option<&Identity>,
    ) -> ServiceResult<ConferenceResults<'conn>> {
        let identity = require_identity(caller)?;
        Ok(self.stream(ConferenceQuery::children_of(identity.user_id.as_str())))
    }

    /// Conferences the caller is registered for, in registration order.
    ///
    /// Keys whose conference no longer resolves are skipped.
    pub fn get_conferences_to_attend(&self, caller: Option<&Identity>) -> ServiceResult<Vec<Conference>> {
        let identity = require_identity(caller)?;
        let existing = SqliteProfileRepository::new(self.conn).get_profile(&identity.user_id)?;
        let profile = match existing {
            Some(profile) => profile,
            None => run_in_transaction(self.conn, &self.retry, |tx| load_or_create_profile(tx, identity))?,
        };

        let conferences = SqliteConferenceRepository::new(self.conn)
            .get_conferences(&profile.conference_keys_to_attend)?;
        Ok(conferences.into_iter().flatten().collect())
    }

    /// Maps conferences to outbound forms with organizer display names.
    pub fn to_forms(&self, conferences: &[Conference]) -> ServiceResult<ConferenceForms> {
        let names = self.organizer_names(conferences)?;
        Ok(ConferenceForms {
            items: conferences
                .iter()
                .map(|conference| {
                    ConferenceForm::from_conference(
                        conference,
                        names.get(&conference.organizer_user_id).map(String::as_str),
                    )
                })
                .collect(),
        })
    }

    /// Maps one conference to its outbound form with the organizer's name.
    pub fn to_form(&self, conference: &Conference) -> ServiceResult<ConferenceForm> {
        let mut forms = self.to_forms(std::slice::from_ref(conference))?;
        Ok(forms.items.pop().unwrap_or_default())
    }

    fn organizer_names(&self, conferences: &[Conference]) -> ServiceResult<HashMap<UserId, String>> {
        let mut user_ids: Vec<UserId> = conferences
            .iter()
            .map(|conference| conference.organizer_user_id.clone())
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let profiles = SqliteProfileRepository::new(self.conn).get_profiles(&user_ids)?;
        Ok(profiles
            .into_iter()
            .flatten()
            .map(|profile| (profile.user_id, profile.display_name))
            .collect())
    }

    fn stream(&self, query: ConferenceQuery) -> ConferenceResults<'conn> {
        ConferenceStream::new(SqliteConferenceRepository::new(self.conn), query, self.page_size)
    }

    fn notify_organizer(&self, identity: &Identity, conference: &Conference, dispatcher: &dyn TaskDispatcher) {
        let payload = ConfirmationEmail {
            email: identity.email.clone(),
            conference_info: conference_summary(conference),
        };
        let result = Task::confirmation_email(&payload).and_then(|task| dispatcher.enqueue(&task));
        match result {
            Ok(()) => info!(
                "event=notification_enqueue module=service status=ok conference_id={}",
                conference.key.id()
            ),
            Err(err) => warn!(
                "event=notification_enqueue module=service status=error conference_id={} error={}",
                conference.key.id(),
                err
            ),
        }
    }
}

fn conference_summary(conference: &Conference) -> String {
    let form = ConferenceForm::from_conference(conference, None);
    format!(
        "name={} city={} topics=[{}] startDate={} endDate={} maxAttendees={} websafeKey={}",
        conference.name,
        conference.city,
        conference.topics.join(", "),
        form.start_date.unwrap_or_default(),
        form.end_date.unwrap_or_default(),
        conference.max_attendees,
        form.websafe_key.unwrap_or_default()
    )
}
