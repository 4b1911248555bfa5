//! Identity claim entity (database row mapping).
//!
//! Server-held mirror of the custom claims set on identity-provider tokens.
//! The users.role column remains the authoritative role; this table records
//! what was pushed to the provider.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the identity_claims table.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityClaimEntity {
    pub uid: String,
    pub claim_key: String,
    pub claim_value: String,
    pub updated_at: DateTime<Utc>,
}
