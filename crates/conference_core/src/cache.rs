//! Key/value cache for derived, rebuildable strings.
//!
//! # Responsibility
//! - Hold the announcement string between refreshes.
//! - Provide SQLite-backed and in-memory implementations behind one trait.
//!
//! # Invariants
//! - Cached values are derived data; losing them never loses state.
//! - `delete` of a missing key is not an error.

use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// Cache key of the "nearly sold out" announcement.
pub const ANNOUNCEMENTS_CACHE_KEY: &str = "RECENT_ANNOUNCEMENTS";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub trait Cache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Cache stored in the `cache_entries` table, shared across processes.
pub struct SqliteCache<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCache<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl Cache for SqliteCache<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cache_entries WHERE cache_key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT INTO cache_entries (cache_key, value) VALUES (?1, ?2)
             ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn
            .execute("DELETE FROM cache_entries WHERE cache_key = ?1;", [key])?;
        Ok(())
    }
}
