//! Repository implementations.

mod identity_claim;
mod invite;
mod membership_request;
mod profile;

pub use identity_claim::IdentityClaimRepository;
pub use invite::{InviteRepository, RedeemOutcome};
pub use membership_request::{ApproveOutcome, MembershipRequestRepository, SetStatusOutcome};
pub use profile::ProfileRepository;
