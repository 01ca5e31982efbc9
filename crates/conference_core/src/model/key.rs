//! Conference keys and their websafe string form.
//!
//! A conference key is structural: it names the organizer profile (ancestor)
//! and a numeric id allocated by the store. The websafe form is an opaque
//! URL-safe base64 string handed to clients.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable external identity of a profile.
pub type UserId = String;

const KEY_KIND_PREFIX: &str = "Conference";

/// Store key of one conference, parented under its organizer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConferenceKey {
    organizer_user_id: UserId,
    id: i64,
}

/// Error for strings that do not decode to a conference key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid conference key: `{0}`")]
pub struct InvalidConferenceKey(pub String);

impl ConferenceKey {
    /// Builds a key from its ancestor profile id and allocated numeric id.
    pub fn new(organizer_user_id: impl Into<UserId>, id: i64) -> Self {
        Self {
            organizer_user_id: organizer_user_id.into(),
            id,
        }
    }

    /// Profile id of the ancestor (organizer) key.
    pub fn organizer_user_id(&self) -> &str {
        &self.organizer_user_id
    }

    /// Allocated numeric id, unique across conferences.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Encodes this key into its opaque websafe form.
    pub fn to_websafe(&self) -> String {
        let raw = format!("{KEY_KIND_PREFIX}:{}:{}", self.id, self.organizer_user_id);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decodes a websafe key string.
    ///
    /// # Errors
    /// - Returns `InvalidConferenceKey` when the string is not valid base64,
    ///   not UTF-8, or does not carry a conference kind, id and ancestor.
    pub fn from_websafe(value: &str) -> Result<Self, InvalidConferenceKey> {
        let invalid = || InvalidConferenceKey(value.to_string());
        let bytes = URL_SAFE_NO_PAD.decode(value.trim()).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;

        let mut parts = raw.splitn(3, ':');
        if parts.next() != Some(KEY_KIND_PREFIX) {
            return Err(invalid());
        }
        let id = parts
            .next()
            .and_then(|part| part.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(invalid)?;
        let organizer_user_id = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(invalid)?;

        Ok(Self::new(organizer_user_id, id))
    }
}

impl Display for ConferenceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_websafe())
    }
}

impl FromStr for ConferenceKey {
    type Err = InvalidConferenceKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_websafe(s)
    }
}
