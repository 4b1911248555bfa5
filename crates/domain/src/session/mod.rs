//! Client-session reconciliation of an identity with its profile.
//!
//! The session manager subscribes to identity-provider state changes,
//! resolves the matching profile, auto-provisions one on first sign-in and
//! keeps the snapshot live-synced against server-side profile writes. The
//! guard module turns a session snapshot into a route access decision.

pub mod guard;
pub mod manager;
pub mod store;

pub use guard::{AccessDecision, RouteGuard, SignInEntry};
pub use manager::SessionManager;
pub use store::{IdentityProvider, ProfileStore, StoreError};

use serde::{Deserialize, Serialize};

use crate::models::profile::Profile;
use crate::models::role::Role;

/// The identity provider's notion of a signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Identity-provider state change.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}

/// The live pairing of an identity and its profile.
///
/// Starts with `loading = true` and resolves either to a signed-out snapshot
/// or to an identity with its (possibly just-provisioned) profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }
}

impl Session {
    /// Role derived from the synced profile. Absent a profile the session is
    /// treated as an ordinary member for redirect purposes.
    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or(Role::Member)
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}
