//! Role-based route guard.
//!
//! A pure function of the session snapshot: no caching, re-evaluated on
//! every navigation and on every session change.

use super::Session;
use crate::models::role::Role;

/// Which sign-in page an unauthenticated visitor is sent to. Admin-scoped
/// routes redirect to the admin entry, everything else to the general one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInEntry {
    General,
    Admin,
}

/// Outcome of evaluating a guard against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Session still resolving: render a placeholder, never redirect yet.
    Pending,
    /// Guarded content may render.
    Allow,
    /// Not signed in: go to the named sign-in entry.
    RedirectToSignIn(SignInEntry),
    /// Signed in but the role does not match: go to the user's own landing
    /// area so the redirect can never loop through a dead end.
    RedirectToHome(Role),
}

/// A route's access requirements.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    required_roles: Vec<Role>,
    entry: SignInEntry,
}

impl RouteGuard {
    /// Guard that admits any signed-in identity regardless of role.
    pub fn any_signed_in(entry: SignInEntry) -> Self {
        Self {
            required_roles: Vec::new(),
            entry,
        }
    }

    /// Guard that admits only the given roles.
    pub fn roles(required_roles: impl Into<Vec<Role>>, entry: SignInEntry) -> Self {
        Self {
            required_roles: required_roles.into(),
            entry,
        }
    }

    pub fn evaluate(&self, session: &Session) -> AccessDecision {
        if session.loading {
            return AccessDecision::Pending;
        }
        if !session.is_signed_in() {
            return AccessDecision::RedirectToSignIn(self.entry);
        }
        let role = session.role();
        if !self.required_roles.is_empty() && !self.required_roles.contains(&role) {
            return AccessDecision::RedirectToHome(role);
        }
        AccessDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Profile;
    use crate::session::Identity;
    use chrono::Utc;

    fn signed_in(role: Role) -> Session {
        let identity = Identity {
            uid: "uid".to_string(),
            email: None,
            display_name: None,
        };
        let mut profile = Profile::provisioned(&identity, Utc::now());
        profile.role = role;
        Session {
            identity: Some(identity),
            profile: Some(profile),
            loading: false,
        }
    }

    fn signed_out() -> Session {
        Session {
            identity: None,
            profile: None,
            loading: false,
        }
    }

    #[test]
    fn test_loading_session_is_pending_not_redirected() {
        let guard = RouteGuard::roles([Role::Admin], SignInEntry::Admin);
        assert_eq!(guard.evaluate(&Session::default()), AccessDecision::Pending);
    }

    #[test]
    fn test_signed_out_redirects_to_matching_entry() {
        let admin_guard = RouteGuard::roles([Role::Admin], SignInEntry::Admin);
        assert_eq!(
            admin_guard.evaluate(&signed_out()),
            AccessDecision::RedirectToSignIn(SignInEntry::Admin)
        );

        let member_guard = RouteGuard::any_signed_in(SignInEntry::General);
        assert_eq!(
            member_guard.evaluate(&signed_out()),
            AccessDecision::RedirectToSignIn(SignInEntry::General)
        );
    }

    #[test]
    fn test_admin_route_denies_member_toward_member_home() {
        let guard = RouteGuard::roles([Role::Admin], SignInEntry::Admin);
        assert_eq!(
            guard.evaluate(&signed_in(Role::Member)),
            AccessDecision::RedirectToHome(Role::Member)
        );
    }

    #[test]
    fn test_member_route_denies_admin_toward_admin_home() {
        let guard = RouteGuard::roles([Role::Member], SignInEntry::General);
        assert_eq!(
            guard.evaluate(&signed_in(Role::Admin)),
            AccessDecision::RedirectToHome(Role::Admin)
        );
    }

    #[test]
    fn test_empty_role_set_admits_any_signed_in_identity() {
        let guard = RouteGuard::any_signed_in(SignInEntry::General);
        assert_eq!(guard.evaluate(&signed_in(Role::Member)), AccessDecision::Allow);
        assert_eq!(guard.evaluate(&signed_in(Role::Admin)), AccessDecision::Allow);
    }

    #[test]
    fn test_matching_role_is_allowed() {
        let guard = RouteGuard::roles([Role::Admin], SignInEntry::Admin);
        assert_eq!(guard.evaluate(&signed_in(Role::Admin)), AccessDecision::Allow);
    }

    #[test]
    fn test_signed_in_without_profile_counts_as_member() {
        let session = Session {
            identity: Some(Identity {
                uid: "uid".to_string(),
                email: None,
                display_name: None,
            }),
            profile: None,
            loading: false,
        };
        let guard = RouteGuard::roles([Role::Admin], SignInEntry::Admin);
        assert_eq!(
            guard.evaluate(&session),
            AccessDecision::RedirectToHome(Role::Member)
        );
        let open = RouteGuard::any_signed_in(SignInEntry::General);
        assert_eq!(open.evaluate(&session), AccessDecision::Allow);
    }
}
