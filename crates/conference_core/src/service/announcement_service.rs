//! Announcement cache refresh and read.
//!
//! # Responsibility
//! - Rebuild the "nearly sold out" announcement from current seat counts.
//! - Serve the cached announcement.
//!
//! # Invariants
//! - Refresh is idempotent: the same store state yields the same cache state.
//! - The cache entry exists only while some conference has
//!   `0 < seats_available <= NEARLY_SOLD_OUT_SEATS`.

use crate::cache::{Cache, ANNOUNCEMENTS_CACHE_KEY};
use crate::query::conference_query::ConferenceQuery;
use crate::repo::conference_repo::{ConferenceStream, SqliteConferenceRepository};
use crate::service::conference_service::DEFAULT_QUERY_PAGE_SIZE;
use crate::service::ServiceResult;
use log::info;
use rusqlite::Connection;

pub const NEARLY_SOLD_OUT_SEATS: u32 = 5;

const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out:";

/// Recomputes the announcement and writes or clears the cache entry.
///
/// Returns the announcement text; empty when nothing is nearly sold out.
pub fn refresh_announcement(conn: &Connection, cache: &dyn Cache) -> ServiceResult<String> {
    let names = ConferenceStream::new(
        SqliteConferenceRepository::new(conn),
        ConferenceQuery::nearly_sold_out(NEARLY_SOLD_OUT_SEATS),
        DEFAULT_QUERY_PAGE_SIZE,
    )
    .map(|conference| conference.map(|conference| conference.name))
    .collect::<Result<Vec<_>, _>>()?;

    if names.is_empty() {
        cache.delete(ANNOUNCEMENTS_CACHE_KEY)?;
        info!("event=announcement_refresh module=service status=ok conferences=0 action=delete");
        return Ok(String::new());
    }

    let announcement = format!("{ANNOUNCEMENT_PREFIX} {}", names.join(", "));
    cache.set(ANNOUNCEMENTS_CACHE_KEY, &announcement)?;
    info!(
        "event=announcement_refresh module=service status=ok conferences={} action=set",
        names.len()
    );
    Ok(announcement)
}

/// Returns the cached announcement, or an empty string.
pub fn get_announcement(cache: &dyn Cache) -> ServiceResult<String> {
    Ok(cache.get(ANNOUNCEMENTS_CACHE_KEY)?.unwrap_or_default())
}
