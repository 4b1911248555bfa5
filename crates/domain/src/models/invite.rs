//! Invite domain models.
//!
//! An invite is a single-use, time-boxed credential granting registration
//! rights for one email address. Invites are never deleted; a consumed or
//! expired record stays behind as an audit trail of who was let in.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// How long a freshly issued invite stays redeemable.
pub const INVITE_TTL_DAYS: i64 = 7;

/// A membership invitation. The token doubles as the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invite {
    pub token: String,
    pub email: String,
    pub full_name: Option<String>,
    pub request_id: Option<Uuid>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Reason an invite cannot be validated or redeemed.
///
/// Expiry takes precedence over consumption: an expired invite reports
/// `Expired` regardless of its `used` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InviteError {
    #[error("Invite not found")]
    NotFound,
    #[error("Invite has expired")]
    Expired,
    #[error("Invite has already been used")]
    AlreadyUsed,
}

impl InviteError {
    /// Stable error code used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            InviteError::NotFound => "not_found",
            InviteError::Expired => "expired",
            InviteError::AlreadyUsed => "already_used",
        }
    }
}

impl Invite {
    /// Classifies the invite at `now` without mutating it.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), InviteError> {
        if now > self.expires_at {
            return Err(InviteError::Expired);
        }
        if self.used {
            return Err(InviteError::AlreadyUsed);
        }
        Ok(())
    }
}

/// Classifies an invite lookup result at `now`, for callers holding an
/// `Option<Invite>` straight from the store.
pub fn classify_invite(invite: Option<&Invite>, now: DateTime<Utc>) -> Result<(), InviteError> {
    match invite {
        None => Err(InviteError::NotFound),
        Some(invite) => invite.check_redeemable(now),
    }
}

/// Request body for issuing an invite.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendInviteRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 1, max = 120, message = "fullName must be 1-120 characters"))]
    pub full_name: String,

    pub request_id: Option<Uuid>,
}

/// Response after issuing an invite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInviteResponse {
    pub invite: Invite,
    pub signup_link: String,
}

/// Response for invite validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidateInviteResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite: Option<Invite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

lazy_static::lazy_static! {
    static ref INVITE_TOKEN_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z2-9]{32}$").unwrap();
}

/// Checks that a string has the shape of an issued token. Used to reject
/// obviously malformed input before hitting the store.
pub fn is_token_shaped(token: &str) -> bool {
    INVITE_TOKEN_REGEX.is_match(token)
}

/// Generates a cryptographically unpredictable invite token.
///
/// 32 characters from a 55-symbol alphabet gives ~185 bits of entropy, far
/// beyond enumeration range. Confusable characters (0/O, 1/l/I) are excluded
/// because tokens end up in emailed links people occasionally retype.
pub fn generate_invite_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();

    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Computes the expiry for an invite created at `created_at`.
pub fn expiry_for(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(INVITE_TTL_DAYS)
}
