//! Entity definitions (database row mappings).

mod identity_claim;
mod invite;
mod membership_request;
mod profile;

pub use identity_claim::IdentityClaimEntity;
pub use invite::InviteEntity;
pub use membership_request::MembershipRequestEntity;
pub use profile::ProfileEntity;
