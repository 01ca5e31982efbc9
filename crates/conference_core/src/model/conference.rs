//! Conference domain model.
//!
//! # Responsibility
//! - Define the canonical conference record and its create/update inputs.
//! - Apply creation defaults, date normalization and sparse patches.
//! - Own the seat counter transitions used by the registration engine.
//!
//! # Invariants
//! - `month` is derived from `start_date` (0 when absent) and never set directly.
//! - `seats_available` starts equal to `max_attendees` and then moves by one
//!   seat per registration or unregistration.
//! - `max_attendees - seats_available` is the registration count; patches to
//!   `max_attendees` preserve it.

use crate::model::key::{ConferenceKey, UserId};
use chrono::{Datelike, NaiveDate};

pub const DEFAULT_CITY: &str = "Default City";
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];
pub const DEFAULT_MAX_ATTENDEES: u32 = 0;

const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";
const CALENDAR_DATE_LEN: usize = 10;

/// Validation failures raised while building or patching conferences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConferenceValidationError {
    #[error("conference `{0}` field required")]
    MissingRequiredField(&'static str),
    #[error("invalid {field} `{value}`; expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("max attendees {requested} is below the {registered} current registrations")]
    CapacityBelowRegistrations { requested: u32, registered: u32 },
}

/// Persisted conference record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conference {
    pub key: ConferenceKey,
    pub name: String,
    pub description: Option<String>,
    /// Denormalized copy of the ancestor profile id for ownership checks.
    pub organizer_user_id: UserId,
    pub topics: Vec<String>,
    pub city: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub month: u32,
    pub max_attendees: u32,
    pub seats_available: u32,
}

/// Validated input for a new conference, defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceDraft {
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: u32,
}

/// Sparse update. `None` means "leave untouched".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferencePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topics: Option<Vec<String>>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: Option<u32>,
}

impl ConferencePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl ConferenceDraft {
    /// Builds a draft, applying defaults for unset city, topics and capacity.
    ///
    /// # Errors
    /// - `MissingRequiredField("name")` when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        topics: Option<Vec<String>>,
        city: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        max_attendees: Option<u32>,
    ) -> Result<Self, ConferenceValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConferenceValidationError::MissingRequiredField("name"));
        }

        Ok(Self {
            name,
            description,
            topics: topics
                .filter(|topics| !topics.is_empty())
                .unwrap_or_else(|| DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()),
            city: city
                .filter(|city| !city.is_empty())
                .unwrap_or_else(|| DEFAULT_CITY.to_string()),
            start_date,
            end_date,
            max_attendees: max_attendees.unwrap_or(DEFAULT_MAX_ATTENDEES),
        })
    }
}

impl Conference {
    /// Materializes a draft under an allocated key.
    ///
    /// `seats_available` starts at `max_attendees`.
    pub fn from_draft(key: ConferenceKey, draft: ConferenceDraft) -> Self {
        let organizer_user_id = key.organizer_user_id().to_string();
        Self {
            key,
            name: draft.name,
            description: draft.description,
            organizer_user_id,
            topics: draft.topics,
            city: draft.city,
            month: derive_month(draft.start_date),
            start_date: draft.start_date,
            end_date: draft.end_date,
            max_attendees: draft.max_attendees,
            seats_available: draft.max_attendees,
        }
    }

    /// Number of profiles currently registered.
    pub fn registered_count(&self) -> u32 {
        self.max_attendees.saturating_sub(self.seats_available)
    }

    /// Takes one seat. Returns `false` when none is left.
    pub fn take_seat(&mut self) -> bool {
        match self.seats_available.checked_sub(1) {
            Some(remaining) => {
                self.seats_available = remaining;
                true
            }
            None => false,
        }
    }

    /// Gives one seat back, never exceeding `max_attendees`.
    pub fn release_seat(&mut self) {
        if self.seats_available < self.max_attendees {
            self.seats_available += 1;
        }
    }

    /// Applies a sparse patch in place.
    ///
    /// # Errors
    /// - `CapacityBelowRegistrations` when the new `max_attendees` is lower
    ///   than the current registration count. Nothing is modified then.
    pub fn apply_patch(&mut self, patch: &ConferencePatch) -> Result<(), ConferenceValidationError> {
        let registered = self.registered_count();
        if let Some(requested) = patch.max_attendees {
            if requested < registered {
                return Err(ConferenceValidationError::CapacityBelowRegistrations {
                    requested,
                    registered,
                });
            }
        }

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(topics) = &patch.topics {
            self.topics = topics.clone();
        }
        if let Some(city) = &patch.city {
            self.city = city.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = Some(start_date);
            self.month = derive_month(Some(start_date));
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(max_attendees) = patch.max_attendees {
            self.max_attendees = max_attendees;
            self.seats_available = max_attendees - registered;
        }
        Ok(())
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// Longer ISO strings (`2024-05-01T09:00:00`) are accepted and truncated to
/// their date part.
///
/// # Errors
/// - `InvalidDate` when the date part does not parse.
pub fn parse_calendar_date(
    field: &'static str,
    value: &str,
) -> Result<NaiveDate, ConferenceValidationError> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..CALENDAR_DATE_LEN).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, CALENDAR_DATE_FORMAT).map_err(|_| {
        ConferenceValidationError::InvalidDate {
            field,
            value: value.to_string(),
        }
    })
}

/// Formats a date the way `parse_calendar_date` reads it.
pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

fn derive_month(start_date: Option<NaiveDate>) -> u32 {
    start_date.map_or(0, |date| date.month())
}
