//! Conference repository contracts, SQLite implementation and lazy streams.
//!
//! # Responsibility
//! - Allocate conference keys under an organizer's profile.
//! - Load/store conferences with their ordered topic list.
//! - Translate `ConferenceQuery` plans into SQL and page through results.
//!
//! # Invariants
//! - Every filter is bound as a parameter; only whitelisted column names and
//!   operator symbols are interpolated into SQL.
//! - Result order is the plan order followed by `conference_id` so paging is
//!   deterministic.
//! - Streams hold no cursor between pages; each page is a fresh query.

use crate::model::conference::{format_calendar_date, Conference};
use crate::model::key::ConferenceKey;
use crate::query::conference_query::ConferenceQuery;
use crate::query::filter::{ConferenceProperty, FilterValue, PropertyFilter};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::VecDeque;

const CONFERENCE_KEY_KIND: &str = "Conference";

const CONFERENCE_SELECT_SQL: &str = "SELECT
    c.conference_key AS conference_key,
    c.conference_id AS conference_id,
    c.organizer_user_id AS organizer_user_id,
    c.name AS name,
    c.description AS description,
    c.city AS city,
    c.start_date AS start_date,
    c.end_date AS end_date,
    c.month AS month,
    c.max_attendees AS max_attendees,
    c.seats_available AS seats_available
FROM conferences c";

/// Repository interface for conference entities.
pub trait ConferenceRepository {
    /// Allocates a fresh key parented under `organizer_user_id`.
    fn allocate_conference_key(&self, organizer_user_id: &str) -> RepoResult<ConferenceKey>;
    /// Loads one conference by key.
    fn get_conference(&self, key: &ConferenceKey) -> RepoResult<Option<Conference>>;
    /// Loads several conferences; the result is aligned with `keys`.
    fn get_conferences(&self, keys: &[ConferenceKey]) -> RepoResult<Vec<Option<Conference>>>;
    /// Inserts or fully replaces one conference.
    fn put_conference(&self, conference: &Conference) -> RepoResult<()>;
    /// Executes one page of a query plan.
    fn fetch_page(
        &self,
        query: &ConferenceQuery,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<Conference>>;
}

/// SQLite-backed conference repository.
#[derive(Clone, Copy)]
pub struct SqliteConferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConferenceRepository for SqliteConferenceRepository<'_> {
    fn allocate_conference_key(&self, organizer_user_id: &str) -> RepoResult<ConferenceKey> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO key_sequences (kind, next_id) VALUES (?1, 1)
             ON CONFLICT(kind) DO UPDATE SET next_id = next_id + 1
             RETURNING next_id;",
            [CONFERENCE_KEY_KIND],
            |row| row.get(0),
        )?;
        Ok(ConferenceKey::new(organizer_user_id, id))
    }

    fn get_conference(&self, key: &ConferenceKey) -> RepoResult<Option<Conference>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONFERENCE_SELECT_SQL}
             WHERE c.conference_key = ?1;"
        ))?;
        let mut rows = stmt.query([key.to_websafe()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_conference_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_conferences(&self, keys: &[ConferenceKey]) -> RepoResult<Vec<Option<Conference>>> {
        keys.iter().map(|key| self.get_conference(key)).collect()
    }

    fn put_conference(&self, conference: &Conference) -> RepoResult<()> {
        let websafe_key = conference.key.to_websafe();
        self.conn.execute(
            "INSERT INTO conferences (
                conference_key,
                conference_id,
                organizer_user_id,
                name,
                description,
                city,
                start_date,
                end_date,
                month,
                max_attendees,
                seats_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(conference_key) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                city = excluded.city,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                month = excluded.month,
                max_attendees = excluded.max_attendees,
                seats_available = excluded.seats_available,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                websafe_key.as_str(),
                conference.key.id(),
                conference.organizer_user_id.as_str(),
                conference.name.as_str(),
                conference.description.as_deref(),
                conference.city.as_str(),
                conference.start_date.map(format_calendar_date),
                conference.end_date.map(format_calendar_date),
                conference.month,
                conference.max_attendees,
                conference.seats_available,
            ],
        )?;

        self.conn.execute(
            "DELETE FROM conference_topics WHERE conference_key = ?1;",
            [websafe_key.as_str()],
        )?;
        for (position, topic) in conference.topics.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO conference_topics (conference_key, position, topic)
                 VALUES (?1, ?2, ?3);",
                params![websafe_key.as_str(), position as i64, topic.as_str()],
            )?;
        }

        Ok(())
    }

    fn fetch_page(
        &self,
        query: &ConferenceQuery,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<Conference>> {
        let (mut sql, mut bind_values) = build_query_sql(query);
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        bind_values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut conferences = Vec::new();
        while let Some(row) = rows.next()? {
            conferences.push(parse_conference_row(self.conn, row)?);
        }
        Ok(conferences)
    }
}

/// Lazy, finite sequence of conferences matching one query plan.
///
/// Pages are fetched on demand. A new stream always restarts from the first
/// result; nothing is carried over between streams.
pub struct ConferenceStream<R> {
    repo: R,
    query: ConferenceQuery,
    page_size: u32,
    offset: u64,
    buffer: VecDeque<Conference>,
    exhausted: bool,
}

impl<R: ConferenceRepository> ConferenceStream<R> {
    pub fn new(repo: R, query: ConferenceQuery, page_size: u32) -> Self {
        Self {
            repo,
            query,
            page_size: page_size.max(1),
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Plan this stream executes.
    pub fn query(&self) -> &ConferenceQuery {
        &self.query
    }
}

impl<R: ConferenceRepository> Iterator for ConferenceStream<R> {
    type Item = RepoResult<Conference>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(conference) = self.buffer.pop_front() {
            return Some(Ok(conference));
        }
        if self.exhausted {
            return None;
        }

        match self.repo.fetch_page(&self.query, self.page_size, self.offset) {
            Ok(page) => {
                if page.len() < self.page_size as usize {
                    self.exhausted = true;
                }
                self.offset += page.len() as u64;
                self.buffer.extend(page);
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

fn build_query_sql(query: &ConferenceQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{CONFERENCE_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(ancestor) = query.ancestor.as_ref() {
        sql.push_str(" AND c.organizer_user_id = ?");
        bind_values.push(Value::Text(ancestor.clone()));
    }

    for filter in &query.filters {
        sql.push_str(" AND ");
        sql.push_str(&filter_predicate(filter));
        bind_values.push(match &filter.value {
            FilterValue::Text(text) => Value::Text(text.clone()),
            FilterValue::Integer(number) => Value::Integer(*number),
        });
    }

    sql.push_str(" ORDER BY ");
    for property in &query.order {
        sql.push_str(sort_expression(*property));
        sql.push_str(" ASC, ");
    }
    sql.push_str("c.conference_id ASC");

    (sql, bind_values)
}

fn filter_predicate(filter: &PropertyFilter) -> String {
    let symbol = filter.operator.symbol();
    match filter.property {
        // Multi-valued: a conference matches when any of its topics matches.
        ConferenceProperty::Topics => format!(
            "EXISTS (
                SELECT 1
                FROM conference_topics t
                WHERE t.conference_key = c.conference_key
                  AND t.topic {symbol} ?
            )"
        ),
        property => format!("{} {symbol} ?", column_name(property)),
    }
}

fn sort_expression(property: ConferenceProperty) -> &'static str {
    match property {
        ConferenceProperty::Topics => {
            "(SELECT MIN(t.topic) FROM conference_topics t WHERE t.conference_key = c.conference_key)"
        }
        property => column_name(property),
    }
}

fn column_name(property: ConferenceProperty) -> &'static str {
    match property {
        ConferenceProperty::Name => "c.name",
        ConferenceProperty::City => "c.city",
        ConferenceProperty::Topics => "c.conference_key",
        ConferenceProperty::Month => "c.month",
        ConferenceProperty::MaxAttendees => "c.max_attendees",
        ConferenceProperty::SeatsAvailable => "c.seats_available",
    }
}

fn parse_conference_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Conference> {
    let key_text: String = row.get("conference_key")?;
    let key = ConferenceKey::from_websafe(&key_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid conference key `{key_text}` in conferences.conference_key"
        ))
    })?;

    let conference_id: i64 = row.get("conference_id")?;
    let organizer_user_id: String = row.get("organizer_user_id")?;
    if key.id() != conference_id || key.organizer_user_id() != organizer_user_id {
        return Err(RepoError::InvalidData(format!(
            "conference key `{key_text}` does not match its id/organizer columns"
        )));
    }

    let max_attendees: u32 = row.get("max_attendees")?;
    let seats_available: u32 = row.get("seats_available")?;
    if seats_available > max_attendees {
        return Err(RepoError::InvalidData(format!(
            "conference `{key_text}` has {seats_available} seats available for {max_attendees} attendees"
        )));
    }

    Ok(Conference {
        topics: load_topics(conn, &key_text)?,
        key,
        name: row.get("name")?,
        description: row.get("description")?,
        organizer_user_id,
        city: row.get("city")?,
        start_date: parse_optional_date(row.get("start_date")?, "conferences.start_date")?,
        end_date: parse_optional_date(row.get("end_date")?, "conferences.end_date")?,
        month: row.get("month")?,
        max_attendees,
        seats_available,
    })
}

fn load_topics(conn: &Connection, conference_key: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT topic
         FROM conference_topics
         WHERE conference_key = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([conference_key])?;
    let mut topics = Vec::new();
    while let Some(row) = rows.next()? {
        topics.push(row.get(0)?);
    }
    Ok(topics)
}

fn parse_optional_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| {
                RepoError::InvalidData(format!("invalid date `{text}` in {column}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::{build_query_sql, ConferenceRepository, ConferenceStream, SqliteConferenceRepository};
    use crate::db::open_db_in_memory;
    use crate::identity::Identity;
    use crate::model::conference::{Conference, ConferenceDraft};
    use crate::model::profile::Profile;
    use crate::query::conference_query::ConferenceQuery;
    use crate::query::filter::RawFilter;
    use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = open_db_in_memory().unwrap();
        SqliteProfileRepository::new(&conn)
            .put_profile(&Profile::for_identity(&Identity::new("org", "Org", "org@x")))
            .unwrap();
        conn
    }

    fn insert(conn: &Connection, name: &str, city: &str, topics: &[&str], max: u32) -> Conference {
        let repo = SqliteConferenceRepository::new(conn);
        let key = repo.allocate_conference_key("org").unwrap();
        let draft = ConferenceDraft::new(
            name,
            None,
            Some(topics.iter().map(|t| t.to_string()).collect()),
            Some(city.to_string()),
            None,
            None,
            Some(max),
        )
        .unwrap();
        let conference = Conference::from_draft(key, draft);
        repo.put_conference(&conference).unwrap();
        conference
    }

    fn names(conn: &Connection, query: ConferenceQuery, page_size: u32) -> Vec<String> {
        ConferenceStream::new(SqliteConferenceRepository::new(conn), query, page_size)
            .map(|conference| conference.unwrap().name)
            .collect()
    }

    #[test]
    fn allocated_keys_are_unique_and_parented() {
        let conn = setup();
        let repo = SqliteConferenceRepository::new(&conn);
        let first = repo.allocate_conference_key("org").unwrap();
        let second = repo.allocate_conference_key("org").unwrap();
        assert_ne!(first, second);
        assert_eq!(first.organizer_user_id(), "org");
    }

    #[test]
    fn put_then_get_roundtrips_topics_in_order() {
        let conn = setup();
        let stored = insert(&conn, "RustConf", "Portland", &["systems", "async"], 10);
        let repo = SqliteConferenceRepository::new(&conn);
        let loaded = repo.get_conference(&stored.key).unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn topic_filters_match_any_element() {
        let conn = setup();
        insert(&conn, "B", "London", &["Medical Innovations", "Health"], 20);
        insert(&conn, "A", "London", &["Programming"], 20);

        let query =
            ConferenceQuery::compile(&[RawFilter::new("TOPIC", "EQ", "Medical Innovations")]).unwrap();
        assert_eq!(names(&conn, query, 10), vec!["B".to_string()]);
    }

    #[test]
    fn stream_pages_through_all_results_in_plan_order() {
        let conn = setup();
        for name in ["delta", "alpha", "echo", "charlie", "bravo"] {
            insert(&conn, name, "Oslo", &["x"], 1);
        }
        assert_eq!(
            names(&conn, ConferenceQuery::all(), 2),
            vec!["alpha", "bravo", "charlie", "delta", "echo"]
        );
    }

    #[test]
    fn sql_binds_values_and_never_interpolates_them() {
        let query = ConferenceQuery::compile(&[RawFilter::new("CITY", "EQ", "x'; DROP TABLE conferences; --")])
            .unwrap();
        let (sql, binds) = build_query_sql(&query);
        assert!(!sql.contains("DROP TABLE"));
        assert_eq!(binds.len(), 1);
        assert!(sql.ends_with("ORDER BY c.name ASC, c.conference_id ASC"));
    }
}
