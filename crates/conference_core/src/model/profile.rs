//! Profile domain model.
//!
//! # Responsibility
//! - Define the per-identity profile record and tee-shirt size enum.
//! - Own the membership helpers used by the registration engine.
//!
//! # Invariants
//! - `user_id` is the stable external identity and never changes.
//! - `conference_keys_to_attend` keeps insertion order and holds no duplicates.

use crate::identity::Identity;
use crate::model::key::{ConferenceKey, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Tee-shirt size offered at conferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

impl TeeShirtSize {
    /// Every size, in declaration order.
    pub const ALL: [TeeShirtSize; 15] = [
        Self::NotSpecified,
        Self::XsM,
        Self::XsW,
        Self::SM,
        Self::SW,
        Self::MM,
        Self::MW,
        Self::LM,
        Self::LW,
        Self::XlM,
        Self::XlW,
        Self::XxlM,
        Self::XxlW,
        Self::XxxlM,
        Self::XxxlW,
    ];

    /// Stable storage and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSpecified => "NOT_SPECIFIED",
            Self::XsM => "XS_M",
            Self::XsW => "XS_W",
            Self::SM => "S_M",
            Self::SW => "S_W",
            Self::MM => "M_M",
            Self::MW => "M_W",
            Self::LM => "L_M",
            Self::LW => "L_W",
            Self::XlM => "XL_M",
            Self::XlW => "XL_W",
            Self::XxlM => "XXL_M",
            Self::XxlW => "XXL_W",
            Self::XxxlM => "XXXL_M",
            Self::XxxlW => "XXXL_W",
        }
    }
}

/// Error for unknown tee-shirt size names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tee-shirt size: `{0}`")]
pub struct UnknownTeeShirtSize(pub String);

impl FromStr for TeeShirtSize {
    type Err = UnknownTeeShirtSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| UnknownTeeShirtSize(s.to_string()))
    }
}

impl Display for TeeShirtSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-identity profile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    /// Conferences this profile is registered for, in registration order.
    pub conference_keys_to_attend: Vec<ConferenceKey>,
}

impl Profile {
    /// Synthesizes the profile a first-time identity receives.
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            main_email: identity.email.clone(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conference_keys_to_attend: Vec::new(),
        }
    }

    /// Returns whether this profile is registered for `key`.
    pub fn is_attending(&self, key: &ConferenceKey) -> bool {
        self.conference_keys_to_attend.contains(key)
    }

    /// Appends `key` unless already present. Returns whether it was added.
    pub fn add_attendance(&mut self, key: &ConferenceKey) -> bool {
        if self.is_attending(key) {
            return false;
        }
        self.conference_keys_to_attend.push(key.clone());
        true
    }

    /// Removes `key` if present. Returns whether it was removed.
    pub fn remove_attendance(&mut self, key: &ConferenceKey) -> bool {
        let before = self.conference_keys_to_attend.len();
        self.conference_keys_to_attend.retain(|current| current != key);
        self.conference_keys_to_attend.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, TeeShirtSize};
    use crate::identity::Identity;
    use crate::model::key::ConferenceKey;

    #[test]
    fn tee_shirt_sizes_parse_their_own_names() {
        for size in TeeShirtSize::ALL {
            assert_eq!(size.as_str().parse::<TeeShirtSize>().unwrap(), size);
        }
        assert!("XXXXL_M".parse::<TeeShirtSize>().is_err());
    }

    #[test]
    fn new_profile_takes_identity_fields_and_default_size() {
        let identity = Identity::new("u-1", "Ada", "ada@example.com");
        let profile = Profile::for_identity(&identity);
        assert_eq!(profile.user_id, "u-1");
        assert_eq!(profile.display_name, "Ada");
        assert_eq!(profile.main_email, "ada@example.com");
        assert_eq!(profile.tee_shirt_size, TeeShirtSize::NotSpecified);
        assert!(profile.conference_keys_to_attend.is_empty());
    }

    #[test]
    fn attendance_helpers_keep_keys_unique_and_ordered() {
        let identity = Identity::new("u-1", "Ada", "ada@example.com");
        let mut profile = Profile::for_identity(&identity);
        let first = ConferenceKey::new("org", 1);
        let second = ConferenceKey::new("org", 2);

        assert!(profile.add_attendance(&first));
        assert!(profile.add_attendance(&second));
        assert!(!profile.add_attendance(&first));
        assert_eq!(profile.conference_keys_to_attend, vec![first.clone(), second.clone()]);

        assert!(profile.remove_attendance(&first));
        assert!(!profile.remove_attendance(&first));
        assert_eq!(profile.conference_keys_to_attend, vec![second]);
    }
}
