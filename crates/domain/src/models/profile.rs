//! Profile domain model.
//!
//! A profile is the mutable, role-bearing record attached to an identity.
//! Its id is immutable and equals the identity provider's opaque uid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::session::Identity;

/// Streak statistics carried on a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Streaks {
    pub current: i32,
}

/// The application-level member record, keyed by identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: String,
    pub streaks: Streaks,
    pub xp: i64,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Synthesizes the default profile provisioned on first sign-in.
    pub fn provisioned(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: identity.uid.clone(),
            full_name: identity.display_name.clone().unwrap_or_default(),
            email: identity.email.clone().unwrap_or_default(),
            role: Role::Member,
            avatar_url: String::new(),
            streaks: Streaks { current: 0 },
            xp: 0,
            created_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioned_defaults() {
        let identity = Identity {
            uid: "uid-123".to_string(),
            email: Some("new@club.org".to_string()),
            display_name: Some("New Member".to_string()),
        };
        let profile = Profile::provisioned(&identity, Utc::now());

        assert_eq!(profile.id, "uid-123");
        assert_eq!(profile.email, "new@club.org");
        assert_eq!(profile.full_name, "New Member");
        assert_eq!(profile.role, Role::Member);
        assert_eq!(profile.avatar_url, "");
        assert_eq!(profile.streaks.current, 0);
        assert_eq!(profile.xp, 0);
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_provisioned_without_identity_details() {
        let identity = Identity {
            uid: "uid-456".to_string(),
            email: None,
            display_name: None,
        };
        let profile = Profile::provisioned(&identity, Utc::now());
        assert_eq!(profile.full_name, "");
        assert_eq!(profile.email, "");
    }

    #[test]
    fn test_is_admin() {
        let identity = Identity {
            uid: "u".to_string(),
            email: None,
            display_name: None,
        };
        let mut profile = Profile::provisioned(&identity, Utc::now());
        profile.role = Role::Admin;
        assert!(profile.is_admin());
    }
}
