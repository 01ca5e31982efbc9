//! Caller identity contracts.
//!
//! # Responsibility
//! - Define the resolved identity threaded into every core operation.
//! - Define the resolver seam used by the public API facade.
//!
//! # Invariants
//! - `Identity::user_id` is stable for one caller across calls.
//! - Core services never look identity up implicitly; it is always passed in.

use crate::model::key::UserId;
use serde::{Deserialize, Serialize};

/// Authenticated caller of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
}

impl Identity {
    pub fn new(
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

/// Resolves the caller of the current operation.
pub trait IdentityResolver {
    /// Returns `None` when the caller is not authenticated.
    fn current_identity(&self) -> Option<Identity>;
}

/// Resolver returning a fixed identity, or none.
///
/// Used by the CLI and by tests; request-scoped hosts construct one per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedIdentity(Option<Identity>);

impl FixedIdentity {
    pub fn authenticated(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityResolver for FixedIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}
