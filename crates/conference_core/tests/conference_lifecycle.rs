use conference_core::model::conference::ConferenceValidationError;
use conference_core::{
    open_db_in_memory, ConferenceApi, ConferenceError, ConferenceForm, ConferenceKey, ErrorKind,
    FixedIdentity, Identity, InMemoryTaskQueue, MemoryCache, SqliteTaskQueue,
};
use rusqlite::Connection;

struct Harness {
    conn: Connection,
    owner: FixedIdentity,
    stranger: FixedIdentity,
    anonymous: FixedIdentity,
    queue: InMemoryTaskQueue,
    cache: MemoryCache,
}

impl Harness {
    fn new() -> Self {
        Self {
            conn: open_db_in_memory().unwrap(),
            owner: FixedIdentity::authenticated(Identity::new("owner", "Olivia", "olivia@example.com")),
            stranger: FixedIdentity::authenticated(Identity::new("stranger", "Sam", "sam@example.com")),
            anonymous: FixedIdentity::anonymous(),
            queue: InMemoryTaskQueue::new(),
            cache: MemoryCache::new(),
        }
    }

    fn as_owner(&self) -> ConferenceApi<'_> {
        ConferenceApi::new(&self.conn, &self.owner, &self.queue, &self.cache)
    }

    fn as_stranger(&self) -> ConferenceApi<'_> {
        ConferenceApi::new(&self.conn, &self.stranger, &self.queue, &self.cache)
    }

    fn as_anonymous(&self) -> ConferenceApi<'_> {
        ConferenceApi::new(&self.conn, &self.anonymous, &self.queue, &self.cache)
    }
}

fn named(name: &str) -> ConferenceForm {
    ConferenceForm {
        name: Some(name.to_string()),
        ..ConferenceForm::default()
    }
}

#[test]
fn create_applies_defaults_and_derives_fields() {
    let harness = Harness::new();
    let created = harness.as_owner().create_conference(&named("Bare")).unwrap();

    assert_eq!(created.city.as_deref(), Some("Default City"));
    assert_eq!(created.topics, vec!["Default".to_string(), "Topic".to_string()]);
    assert_eq!(created.max_attendees, Some(0));
    assert_eq!(created.seats_available, Some(0));
    assert_eq!(created.month, Some(0));
    assert_eq!(created.organizer_user_id.as_deref(), Some("owner"));
    assert_eq!(created.organizer_display_name.as_deref(), Some("Olivia"));
    assert!(created.websafe_key.is_some());
}

#[test]
fn create_sets_seats_from_capacity_and_ignores_client_owned_fields() {
    let harness = Harness::new();
    let created = harness
        .as_owner()
        .create_conference(&ConferenceForm {
            name: Some("RustConf".to_string()),
            max_attendees: Some(10),
            seats_available: Some(999),
            month: Some(1),
            organizer_user_id: Some("someone-else".to_string()),
            start_date: Some("2024-11-05".to_string()),
            end_date: Some("2024-11-07".to_string()),
            ..ConferenceForm::default()
        })
        .unwrap();

    assert_eq!(created.seats_available, Some(10));
    assert_eq!(created.month, Some(11));
    assert_eq!(created.organizer_user_id.as_deref(), Some("owner"));
    assert_eq!(created.start_date.as_deref(), Some("2024-11-05"));
    assert_eq!(created.end_date.as_deref(), Some("2024-11-07"));
}

#[test]
fn create_validation_failures_write_nothing() {
    let harness = Harness::new();
    let api = harness.as_owner();

    let missing = api.create_conference(&ConferenceForm::default()).unwrap_err();
    assert!(matches!(
        missing,
        ConferenceError::Validation(ConferenceValidationError::MissingRequiredField("name"))
    ));
    assert_eq!(missing.kind(), ErrorKind::Validation);

    let bad_date = api
        .create_conference(&ConferenceForm {
            name: Some("RustConf".to_string()),
            start_date: Some("next tuesday".to_string()),
            ..ConferenceForm::default()
        })
        .unwrap_err();
    assert!(matches!(
        bad_date,
        ConferenceError::Validation(ConferenceValidationError::InvalidDate { .. })
    ));

    assert!(api.get_conferences_created().unwrap().items.is_empty());
    assert!(harness.queue.is_empty());
}

#[test]
fn anonymous_callers_cannot_create_or_list_their_conferences() {
    let harness = Harness::new();
    let api = harness.as_anonymous();
    assert!(matches!(
        api.create_conference(&named("RustConf")).unwrap_err(),
        ConferenceError::Unauthenticated
    ));
    assert!(matches!(
        api.get_conferences_created().unwrap_err(),
        ConferenceError::Unauthenticated
    ));
}

#[test]
fn get_conferences_created_lists_only_the_callers_in_creation_order() {
    let harness = Harness::new();
    harness.as_owner().create_conference(&named("Second by name")).unwrap();
    harness.as_stranger().create_conference(&named("Not mine")).unwrap();
    harness.as_owner().create_conference(&named("A first by name")).unwrap();

    let names: Vec<_> = harness
        .as_owner()
        .get_conferences_created()
        .unwrap()
        .items
        .into_iter()
        .map(|form| form.name.unwrap())
        .collect();
    assert_eq!(names, vec!["Second by name", "A first by name"]);
}

#[test]
fn owner_patch_touches_only_present_fields() {
    let harness = Harness::new();
    let api = harness.as_owner();
    let created = api
        .create_conference(&ConferenceForm {
            name: Some("RustConf".to_string()),
            city: Some("Portland".to_string()),
            max_attendees: Some(10),
            ..ConferenceForm::default()
        })
        .unwrap();
    let key = created.websafe_key.clone().unwrap();

    let updated = api
        .update_conference(
            &key,
            &ConferenceForm {
                name: Some(String::new()),
                description: Some("Systems programming".to_string()),
                start_date: Some("2025-09-02".to_string()),
                seats_available: Some(1),
                ..ConferenceForm::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name.as_deref(), Some("RustConf"));
    assert_eq!(updated.city.as_deref(), Some("Portland"));
    assert_eq!(updated.description.as_deref(), Some("Systems programming"));
    assert_eq!(updated.month, Some(9));
    assert_eq!(updated.seats_available, Some(10));
    assert_eq!(api.get_conference(&key).unwrap(), updated);
}

#[test]
fn non_owner_update_is_rejected_and_leaves_record_unchanged() {
    let harness = Harness::new();
    let created = harness.as_owner().create_conference(&named("RustConf")).unwrap();
    let key = created.websafe_key.clone().unwrap();

    let err = harness
        .as_stranger()
        .update_conference(&key, &named("Hijacked"))
        .unwrap_err();
    assert!(matches!(err, ConferenceError::NotOwner));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(harness.as_owner().get_conference(&key).unwrap(), created);
}

#[test]
fn capacity_patch_keeps_registrations_and_rejects_shrinking_below_them() {
    let harness = Harness::new();
    let created = harness
        .as_owner()
        .create_conference(&ConferenceForm {
            name: Some("RustConf".to_string()),
            max_attendees: Some(5),
            ..ConferenceForm::default()
        })
        .unwrap();
    let key = created.websafe_key.unwrap();
    assert!(harness.as_stranger().register_for_conference(&key).unwrap());
    assert!(harness.as_owner().register_for_conference(&key).unwrap());

    let grown = harness
        .as_owner()
        .update_conference(
            &key,
            &ConferenceForm {
                max_attendees: Some(8),
                ..ConferenceForm::default()
            },
        )
        .unwrap();
    assert_eq!(grown.seats_available, Some(6));

    let err = harness
        .as_owner()
        .update_conference(
            &key,
            &ConferenceForm {
                max_attendees: Some(1),
                ..ConferenceForm::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ConferenceError::Validation(ConferenceValidationError::CapacityBelowRegistrations {
            requested: 1,
            registered: 2
        })
    ));
    assert_eq!(harness.as_owner().get_conference(&key).unwrap(), grown);
}

#[test]
fn unknown_and_malformed_keys_are_distinguished() {
    let harness = Harness::new();
    let api = harness.as_owner();

    let malformed = api.get_conference("%%%").unwrap_err();
    assert!(matches!(malformed, ConferenceError::InvalidConferenceKey(_)));
    assert_eq!(malformed.kind(), ErrorKind::Validation);

    let unknown = ConferenceKey::new("owner", 999).to_websafe();
    let err = api.update_conference(&unknown, &named("Renamed")).unwrap_err();
    assert!(matches!(err, ConferenceError::ConferenceNotFound(_)));
    assert_eq!(api.get_conference(&unknown).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn creation_enqueues_a_durable_confirmation_task() {
    let harness = Harness::new();
    let durable = SqliteTaskQueue::new(&harness.conn);
    let api = ConferenceApi::new(&harness.conn, &harness.owner, &durable, &harness.cache);
    api.create_conference(&named("RustConf")).unwrap();

    let pending = durable.pending(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_type, "send_confirmation_email");
    assert_eq!(pending[0].payload["email"], "olivia@example.com");
    assert!(durable.complete(pending[0].id).unwrap());
    assert!(durable.pending(10).unwrap().is_empty());
}
