use conference_core::{
    open_db_in_memory, Cache, ConferenceApi, ConferenceForm, FixedIdentity, Identity,
    InMemoryTaskQueue, MemoryCache, SqliteCache, ANNOUNCEMENTS_CACHE_KEY,
};
use rusqlite::Connection;

fn create(api: &ConferenceApi<'_>, name: &str, max_attendees: u32) -> String {
    api.create_conference(&ConferenceForm {
        name: Some(name.to_string()),
        max_attendees: Some(max_attendees),
        ..ConferenceForm::default()
    })
    .unwrap()
    .websafe_key
    .unwrap()
}

fn organizer() -> FixedIdentity {
    FixedIdentity::authenticated(Identity::new("org", "Org", "org@example.com"))
}

#[test]
fn refresh_lists_nearly_sold_out_conferences_only() {
    let conn = open_db_in_memory().unwrap();
    let identity = organizer();
    let queue = InMemoryTaskQueue::new();
    let cache = MemoryCache::new();
    let api = ConferenceApi::new(&conn, &identity, &queue, &cache);

    create(&api, "Roomy", 100);
    create(&api, "Tiny", 3);
    create(&api, "Cozy", 5);
    let sold_out = create(&api, "Gone", 1);
    create(&api, "Zero", 0);
    assert!(api.register_for_conference(&sold_out).unwrap());

    let announcement = api.refresh_announcement().unwrap();
    assert_eq!(
        announcement,
        "Last chance to attend! The following conferences are nearly sold out: Tiny, Cozy"
    );
    assert_eq!(api.get_announcement().unwrap(), announcement);
}

#[test]
fn refresh_is_idempotent_and_clears_when_nothing_qualifies() {
    let conn = open_db_in_memory().unwrap();
    let identity = organizer();
    let queue = InMemoryTaskQueue::new();
    let cache = MemoryCache::new();
    let api = ConferenceApi::new(&conn, &identity, &queue, &cache);

    let key = create(&api, "Small", 1);
    let first = api.refresh_announcement().unwrap();
    let second = api.refresh_announcement().unwrap();
    assert_eq!(first, second);
    assert!(cache.get(ANNOUNCEMENTS_CACHE_KEY).unwrap().is_some());

    assert!(api.register_for_conference(&key).unwrap());
    assert_eq!(api.refresh_announcement().unwrap(), "");
    assert_eq!(cache.get(ANNOUNCEMENTS_CACHE_KEY).unwrap(), None);
    assert_eq!(api.get_announcement().unwrap(), "");
}

#[test]
fn sqlite_cache_shares_the_announcement_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("announce.sqlite3");

    {
        let conn = conference_core::open_db(&path).unwrap();
        let identity = organizer();
        let queue = InMemoryTaskQueue::new();
        let cache = SqliteCache::new(&conn);
        let api = ConferenceApi::new(&conn, &identity, &queue, &cache);
        create(&api, "Tiny", 2);
        api.refresh_announcement().unwrap();
    }

    let conn: Connection = conference_core::open_db(&path).unwrap();
    let anonymous = FixedIdentity::anonymous();
    let queue = InMemoryTaskQueue::new();
    let cache = SqliteCache::new(&conn);
    let api = ConferenceApi::new(&conn, &anonymous, &queue, &cache);
    assert!(api.get_announcement().unwrap().ends_with("nearly sold out: Tiny"));
}
