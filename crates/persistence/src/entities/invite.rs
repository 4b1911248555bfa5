//! Invite entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::invite::Invite;

/// Database row mapping for the invites table. The token is the primary key.
#[derive(Debug, Clone, FromRow)]
pub struct InviteEntity {
    pub token: String,
    pub email: String,
    pub full_name: Option<String>,
    pub request_id: Option<Uuid>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<InviteEntity> for Invite {
    fn from(entity: InviteEntity) -> Self {
        Invite {
            token: entity.token,
            email: entity.email,
            full_name: entity.full_name,
            request_id: entity.request_id,
            used: entity.used,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
        }
    }
}
