//! Membership request entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use domain::models::request::{MembershipRequest, RequestStatus};

/// Database row mapping for the requests table.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRequestEntity {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<String>,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl MembershipRequestEntity {
    /// Converts the row into the domain model. An unparseable status column
    /// is a data corruption and maps to an error rather than a guess.
    pub fn into_model(self) -> Result<MembershipRequest, String> {
        let status = RequestStatus::from_str(&self.status)?;
        Ok(MembershipRequest {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            department: self.department,
            skills: self.skills,
            reason: self.reason,
            status,
            created_at: self.created_at,
        })
    }
}
