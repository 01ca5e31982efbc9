//! Profile repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and store profiles together with their ordered attendance list.
//!
//! # Invariants
//! - `put_profile` replaces the whole attendance list; callers run it inside
//!   a transaction when it must commit together with other writes.
//! - Attendance order is the `position` column order.

use crate::model::key::{ConferenceKey, UserId};
use crate::model::profile::{Profile, TeeShirtSize};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for profile entities.
pub trait ProfileRepository {
    /// Loads one profile by identity.
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>>;
    /// Loads several profiles; the result is aligned with `user_ids`.
    fn get_profiles(&self, user_ids: &[UserId]) -> RepoResult<Vec<Option<Profile>>>;
    /// Inserts or fully replaces one profile.
    fn put_profile(&self, profile: &Profile) -> RepoResult<()>;
}

/// SQLite-backed profile repository.
#[derive(Clone, Copy)]
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>> {
        let row = self
            .conn
            .query_row(
                "SELECT
                    user_id,
                    display_name,
                    main_email,
                    tee_shirt_size
                 FROM profiles
                 WHERE user_id = ?1;",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, String>("user_id")?,
                        row.get::<_, String>("display_name")?,
                        row.get::<_, String>("main_email")?,
                        row.get::<_, String>("tee_shirt_size")?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, display_name, main_email, size_text)) = row else {
            return Ok(None);
        };

        let tee_shirt_size = size_text.parse::<TeeShirtSize>().map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid tee shirt size `{size_text}` in profiles.tee_shirt_size"
            ))
        })?;
        let conference_keys_to_attend = load_attendance(self.conn, &user_id)?;

        Ok(Some(Profile {
            user_id,
            display_name,
            main_email,
            tee_shirt_size,
            conference_keys_to_attend,
        }))
    }

    fn get_profiles(&self, user_ids: &[UserId]) -> RepoResult<Vec<Option<Profile>>> {
        user_ids
            .iter()
            .map(|user_id| self.get_profile(user_id))
            .collect()
    }

    fn put_profile(&self, profile: &Profile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO profiles (
                user_id,
                display_name,
                main_email,
                tee_shirt_size
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                main_email = excluded.main_email,
                tee_shirt_size = excluded.tee_shirt_size,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                profile.user_id.as_str(),
                profile.display_name.as_str(),
                profile.main_email.as_str(),
                profile.tee_shirt_size.as_str(),
            ],
        )?;

        self.conn.execute(
            "DELETE FROM profile_attendance WHERE user_id = ?1;",
            [profile.user_id.as_str()],
        )?;
        for (position, key) in profile.conference_keys_to_attend.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO profile_attendance (user_id, position, conference_key)
                 VALUES (?1, ?2, ?3);",
                params![profile.user_id.as_str(), position as i64, key.to_websafe()],
            )?;
        }

        Ok(())
    }
}

fn load_attendance(conn: &Connection, user_id: &str) -> RepoResult<Vec<ConferenceKey>> {
    let mut stmt = conn.prepare(
        "SELECT conference_key
         FROM profile_attendance
         WHERE user_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([user_id])?;
    let mut keys = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        let key = ConferenceKey::from_websafe(&value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid conference key `{value}` in profile_attendance.conference_key"
            ))
        })?;
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::{ProfileRepository, SqliteProfileRepository};
    use crate::db::open_db_in_memory;
    use crate::identity::Identity;
    use crate::model::key::ConferenceKey;
    use crate::model::profile::{Profile, TeeShirtSize};

    #[test]
    fn put_then_get_keeps_attendance_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteProfileRepository::new(&conn);

        let mut profile = Profile::for_identity(&Identity::new("u-1", "Ada", "ada@example.com"));
        profile.tee_shirt_size = TeeShirtSize::MW;
        profile.conference_keys_to_attend = vec![ConferenceKey::new("b", 2), ConferenceKey::new("a", 1)];
        repo.put_profile(&profile).unwrap();

        let loaded = repo.get_profile("u-1").unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn put_replaces_existing_profile() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteProfileRepository::new(&conn);

        let mut profile = Profile::for_identity(&Identity::new("u-1", "Ada", "ada@example.com"));
        profile.conference_keys_to_attend = vec![ConferenceKey::new("a", 1)];
        repo.put_profile(&profile).unwrap();

        profile.display_name = "Ada L.".to_string();
        profile.conference_keys_to_attend.clear();
        repo.put_profile(&profile).unwrap();

        let loaded = repo.get_profile("u-1").unwrap().unwrap();
        assert_eq!(loaded.display_name, "Ada L.");
        assert!(loaded.conference_keys_to_attend.is_empty());
    }

    #[test]
    fn get_profiles_is_aligned_with_input() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteProfileRepository::new(&conn);
        repo.put_profile(&Profile::for_identity(&Identity::new("u-1", "Ada", "a@x")))
            .unwrap();

        let loaded = repo
            .get_profiles(&["missing".to_string(), "u-1".to_string()])
            .unwrap();
        assert!(loaded[0].is_none());
        assert_eq!(loaded[1].as_ref().map(|p| p.user_id.as_str()), Some("u-1"));
    }
}
