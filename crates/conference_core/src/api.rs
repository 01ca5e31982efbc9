//! Public operation surface over wire forms.
//!
//! # Responsibility
//! - Resolve the caller once per operation and thread it into services.
//! - Map wire forms in and out; services only see domain values.
//!
//! # Invariants
//! - Every operation resolves identity through the one `IdentityResolver`.
//! - List operations return fully materialized `ConferenceForms`.

use crate::cache::Cache;
use crate::config::CoreConfig;
use crate::db::RetryPolicy;
use crate::identity::{Identity, IdentityResolver};
use crate::model::forms::{
    ConferenceForm, ConferenceForms, ConferenceQueryForms, ProfileForm, ProfileMiniForm,
};
use crate::model::conference::Conference;
use crate::service::announcement_service;
use crate::service::conference_service::{ConferenceService, DEFAULT_QUERY_PAGE_SIZE};
use crate::service::profile_service::ProfileService;
use crate::service::registration_service::RegistrationService;
use crate::service::ServiceResult;
use crate::tasks::TaskDispatcher;
use rusqlite::Connection;

/// Conference Central operations bound to one connection and collaborators.
pub struct ConferenceApi<'a> {
    conn: &'a Connection,
    identity: &'a dyn IdentityResolver,
    dispatcher: &'a dyn TaskDispatcher,
    cache: &'a dyn Cache,
    retry: RetryPolicy,
    page_size: u32,
}

impl<'a> ConferenceApi<'a> {
    pub fn new(
        conn: &'a Connection,
        identity: &'a dyn IdentityResolver,
        dispatcher: &'a dyn TaskDispatcher,
        cache: &'a dyn Cache,
    ) -> Self {
        Self {
            conn,
            identity,
            dispatcher,
            cache,
            retry: RetryPolicy::default(),
            page_size: DEFAULT_QUERY_PAGE_SIZE,
        }
    }

    /// Applies retry and paging settings from `config`.
    pub fn with_config(mut self, config: &CoreConfig) -> Self {
        self.retry = config.retry_policy();
        self.page_size = config.query_page_size;
        self
    }

    pub fn get_profile(&self) -> ServiceResult<ProfileForm> {
        let caller = self.caller();
        let profile = self.profiles().get_profile(caller.as_ref())?;
        Ok(ProfileForm::from(&profile))
    }

    pub fn save_profile(&self, form: &ProfileMiniForm) -> ServiceResult<ProfileForm> {
        let caller = self.caller();
        let profile = self.profiles().save_profile(caller.as_ref(), form)?;
        Ok(ProfileForm::from(&profile))
    }

    pub fn create_conference(&self, form: &ConferenceForm) -> ServiceResult<ConferenceForm> {
        let caller = self.caller();
        let conferences = self.conferences();
        let created = conferences.create_conference(caller.as_ref(), form, self.dispatcher)?;
        conferences.to_form(&created)
    }

    pub fn update_conference(
        &self,
        websafe_key: &str,
        form: &ConferenceForm,
    ) -> ServiceResult<ConferenceForm> {
        let caller = self.caller();
        let conferences = self.conferences();
        let updated = conferences.update_conference(caller.as_ref(), websafe_key, form)?;
        conferences.to_form(&updated)
    }

    pub fn get_conference(&self, websafe_key: &str) -> ServiceResult<ConferenceForm> {
        let conferences = self.conferences();
        let conference = conferences.get_conference(websafe_key)?;
        conferences.to_form(&conference)
    }

    pub fn query_conferences(&self, query: &ConferenceQueryForms) -> ServiceResult<ConferenceForms> {
        let conferences = self.conferences();
        let results = conferences
            .query_conferences(&query.to_raw_filters())?
            .collect::<Result<Vec<Conference>, _>>()?;
        conferences.to_forms(&results)
    }

    pub fn get_conferences_created(&self) -> ServiceResult<ConferenceForms> {
        let caller = self.caller();
        let conferences = self.conferences();
        let results = conferences
            .get_conferences_created(caller.as_ref())?
            .collect::<Result<Vec<Conference>, _>>()?;
        conferences.to_forms(&results)
    }

    pub fn register_for_conference(&self, websafe_key: &str) -> ServiceResult<bool> {
        let caller = self.caller();
        self.registrations().register(caller.as_ref(), websafe_key)
    }

    pub fn unregister_from_conference(&self, websafe_key: &str) -> ServiceResult<bool> {
        let caller = self.caller();
        self.registrations().unregister(caller.as_ref(), websafe_key)
    }

    pub fn get_conferences_to_attend(&self) -> ServiceResult<ConferenceForms> {
        let caller = self.caller();
        let conferences = self.conferences();
        let results = conferences.get_conferences_to_attend(caller.as_ref())?;
        conferences.to_forms(&results)
    }

    pub fn get_announcement(&self) -> ServiceResult<String> {
        announcement_service::get_announcement(self.cache)
    }

    /// Rebuilds the cached announcement; meant for a periodic trigger.
    pub fn refresh_announcement(&self) -> ServiceResult<String> {
        announcement_service::refresh_announcement(self.conn, self.cache)
    }

    fn caller(&self) -> Option<Identity> {
        self.identity.current_identity()
    }

    fn profiles(&self) -> ProfileService<'a> {
        ProfileService::new(self.conn, self.retry)
    }

    fn conferences(&self) -> ConferenceService<'a> {
        ConferenceService::new(self.conn, self.retry).with_page_size(self.page_size)
    }

    fn registrations(&self) -> RegistrationService<'a> {
        RegistrationService::new(self.conn, self.retry)
    }
}
