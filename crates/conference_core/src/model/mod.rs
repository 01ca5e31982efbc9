//! Domain model for profiles, conferences and their wire forms.
//!
//! # Responsibility
//! - Define canonical records used by core business logic.
//! - Define the external wire forms and explicit mappings between the two.
//!
//! # Invariants
//! - A conference key always embeds its organizer's profile id as ancestor.
//! - `Profile::conference_keys_to_attend` never holds duplicates.
//! - `seats_available <= max_attendees` for every persisted conference.

pub mod conference;
pub mod forms;
pub mod key;
pub mod profile;
