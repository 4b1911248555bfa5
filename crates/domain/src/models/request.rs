//! Membership request (application) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// A membership application submitted through the public portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MembershipRequest {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<String>,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a membership request.
///
/// `Approved` and `Rejected` are terminal; once set, no further transition
/// is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request body for submitting a membership application.
///
/// Resubmission by the same email is deliberately allowed; each submission
/// creates an independent pending record.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SubmitRequestPayload {
    #[validate(length(min = 1, max = 120, message = "full_name must be 1-120 characters"))]
    pub full_name: String,

    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[validate(length(max = 32, message = "phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 120, message = "department must be at most 120 characters"))]
    pub department: Option<String>,

    #[serde(default)]
    pub skills: Vec<String>,

    #[validate(length(max = 2000, message = "reason must be at most 2000 characters"))]
    pub reason: Option<String>,
}

/// Request body for an explicit status transition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SetStatusPayload {
    pub status: RequestStatus,
}
