//! Wire forms and explicit mappings to/from domain records.
//!
//! # Responsibility
//! - Define the external request/response shapes (camelCase on the wire).
//! - Map forms to domain inputs and domain records to forms, field by field.
//!
//! # Invariants
//! - Inbound conference forms never set `organizerUserId`, `month`,
//!   `seatsAvailable` or `websafeKey`; those are derived by core.
//! - Patch mapping treats absent and empty values as "leave untouched".

use crate::model::conference::{
    format_calendar_date, parse_calendar_date, Conference, ConferenceDraft, ConferencePatch,
    ConferenceValidationError,
};
use crate::model::profile::{Profile, TeeShirtSize};
use crate::query::filter::RawFilter;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Profile fields a user may edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMiniForm {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// Outbound profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    pub conference_keys_to_attend: Vec<String>,
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            main_email: profile.main_email.clone(),
            tee_shirt_size: profile.tee_shirt_size,
            conference_keys_to_attend: profile
                .conference_keys_to_attend
                .iter()
                .map(|key| key.to_websafe())
                .collect(),
        }
    }
}

/// Inbound and outbound conference shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organizer_user_id: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
    #[serde(default)]
    pub seats_available: Option<u32>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub websafe_key: Option<String>,
    #[serde(default)]
    pub organizer_display_name: Option<String>,
}

impl ConferenceForm {
    /// Maps a stored conference to its outbound form.
    pub fn from_conference(conference: &Conference, organizer_display_name: Option<&str>) -> Self {
        Self {
            name: Some(conference.name.clone()),
            description: conference.description.clone(),
            organizer_user_id: Some(conference.organizer_user_id.clone()),
            topics: conference.topics.clone(),
            city: Some(conference.city.clone()),
            start_date: conference.start_date.map(format_calendar_date),
            month: Some(conference.month),
            max_attendees: Some(conference.max_attendees),
            seats_available: Some(conference.seats_available),
            end_date: conference.end_date.map(format_calendar_date),
            websafe_key: Some(conference.key.to_websafe()),
            organizer_display_name: organizer_display_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }

    /// Maps a create request to a validated draft.
    ///
    /// # Errors
    /// - `MissingRequiredField("name")` when `name` is absent or blank.
    /// - `InvalidDate` when `startDate`/`endDate` do not parse.
    pub fn to_draft(&self) -> Result<ConferenceDraft, ConferenceValidationError> {
        let name = self.name.clone().unwrap_or_default();
        if name.trim().is_empty() {
            return Err(ConferenceValidationError::MissingRequiredField("name"));
        }

        ConferenceDraft::new(
            name,
            non_empty(&self.description),
            Some(self.topics.clone()),
            non_empty(&self.city),
            parse_optional_date("startDate", &self.start_date)?,
            parse_optional_date("endDate", &self.end_date)?,
            self.max_attendees,
        )
    }

    /// Maps an update request to a sparse patch.
    ///
    /// # Errors
    /// - `InvalidDate` when a present `startDate`/`endDate` does not parse.
    pub fn to_patch(&self) -> Result<ConferencePatch, ConferenceValidationError> {
        Ok(ConferencePatch {
            name: non_empty(&self.name),
            description: non_empty(&self.description),
            topics: Some(self.topics.clone()).filter(|topics| !topics.is_empty()),
            city: non_empty(&self.city),
            start_date: parse_optional_date("startDate", &self.start_date)?,
            end_date: parse_optional_date("endDate", &self.end_date)?,
            max_attendees: self.max_attendees,
        })
    }
}

/// List envelope for conference responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceForms {
    pub items: Vec<ConferenceForm>,
}

/// One raw filter clause as sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceQueryForm {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl From<&ConferenceQueryForm> for RawFilter {
    fn from(form: &ConferenceQueryForm) -> Self {
        RawFilter::new(form.field.as_str(), form.operator.as_str(), form.value.as_str())
    }
}

/// Filter clause list for `queryConferences`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceQueryForms {
    #[serde(default)]
    pub filters: Vec<ConferenceQueryForm>,
}

impl ConferenceQueryForms {
    pub fn to_raw_filters(&self) -> Vec<RawFilter> {
        self.filters.iter().map(RawFilter::from).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.is_empty()).cloned()
}

fn parse_optional_date(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<NaiveDate>, ConferenceValidationError> {
    match value.as_deref() {
        Some(text) if !text.is_empty() => parse_calendar_date(field, text).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::key::ConferenceKey;

    #[test]
    fn create_form_maps_to_draft_with_defaults() {
        let form = ConferenceForm {
            name: Some("RustConf".to_string()),
            start_date: Some("2024-09-10".to_string()),
            max_attendees: Some(10),
            seats_available: Some(999),
            organizer_user_id: Some("spoofed".to_string()),
            ..ConferenceForm::default()
        };
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.city, "Default City");
        assert_eq!(draft.max_attendees, 10);
        assert_eq!(draft.start_date.map(format_calendar_date).as_deref(), Some("2024-09-10"));

        let conference = Conference::from_draft(ConferenceKey::new("owner", 3), draft);
        assert_eq!(conference.seats_available, 10);
        assert_eq!(conference.organizer_user_id, "owner");
    }

    #[test]
    fn create_form_requires_name_before_parsing_dates() {
        let form = ConferenceForm {
            start_date: Some("garbage".to_string()),
            ..ConferenceForm::default()
        };
        assert_eq!(
            form.to_draft().unwrap_err(),
            ConferenceValidationError::MissingRequiredField("name")
        );
    }

    #[test]
    fn update_form_maps_empty_values_to_untouched() {
        let form = ConferenceForm {
            name: Some(String::new()),
            city: Some("Paris".to_string()),
            start_date: Some(String::new()),
            seats_available: Some(1),
            month: Some(12),
            ..ConferenceForm::default()
        };
        let patch = form.to_patch().unwrap();
        assert_eq!(
            patch,
            ConferencePatch {
                city: Some("Paris".to_string()),
                ..ConferencePatch::default()
            }
        );
    }

    #[test]
    fn outbound_form_uses_camel_case_and_websafe_key() {
        let draft = ConferenceDraft::new("RustConf", None, None, Some("Oslo".to_string()), None, None, Some(4))
            .unwrap();
        let conference = Conference::from_draft(ConferenceKey::new("owner", 9), draft);
        let form = ConferenceForm::from_conference(&conference, Some("Owner Name"));

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["maxAttendees"], 4);
        assert_eq!(json["seatsAvailable"], 4);
        assert_eq!(json["organizerDisplayName"], "Owner Name");
        assert_eq!(
            json["websafeKey"].as_str().unwrap(),
            ConferenceKey::new("owner", 9).to_websafe()
        );
    }

    #[test]
    fn profile_mini_form_reads_wire_enum_names() {
        let form: ProfileMiniForm =
            serde_json::from_str(r#"{"displayName":"Ada","teeShirtSize":"XL_W"}"#).unwrap();
        assert_eq!(form.display_name.as_deref(), Some("Ada"));
        assert_eq!(form.tee_shirt_size, Some(TeeShirtSize::XlW));
    }
}
