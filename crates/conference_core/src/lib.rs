//! Core domain logic for Conference Central.
//! This crate is the single source of truth for profile, conference and
//! registration invariants.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod tasks;

pub use api::ConferenceApi;
pub use cache::{Cache, CacheError, MemoryCache, SqliteCache, ANNOUNCEMENTS_CACHE_KEY};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, open_db_with_busy_timeout, DbError, RetryPolicy};
pub use identity::{FixedIdentity, Identity, IdentityResolver};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::conference::{Conference, ConferenceDraft, ConferencePatch, ConferenceValidationError};
pub use model::forms::{
    ConferenceForm, ConferenceForms, ConferenceQueryForm, ConferenceQueryForms, ProfileForm,
    ProfileMiniForm,
};
pub use model::key::{ConferenceKey, InvalidConferenceKey, UserId};
pub use model::profile::{Profile, TeeShirtSize};
pub use query::conference_query::ConferenceQuery;
pub use query::filter::{compile_filters, FilterError, RawFilter};
pub use repo::{RepoError, RepoResult};
pub use service::{ConferenceError, ErrorKind, ServiceResult};
pub use tasks::{InMemoryTaskQueue, SqliteTaskQueue, Task, TaskDispatcher, TaskError};

/// Minimal health-check API for hosts and the CLI.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
