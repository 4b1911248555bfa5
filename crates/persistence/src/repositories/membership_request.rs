//! Repository for membership request database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::request::RequestStatus;

use crate::entities::{InviteEntity, MembershipRequestEntity};

const REQUEST_COLUMNS: &str =
    "id, full_name, email, phone, department, skills, reason, status, created_at";

/// Outcome of a status transition attempt.
#[derive(Debug, Clone)]
pub enum SetStatusOutcome {
    Updated(MembershipRequestEntity),
    NotFound,
    /// The request already reached a terminal state; transitions out of
    /// approved/rejected are illegal.
    InvalidTransition(MembershipRequestEntity),
}

/// Outcome of the composite approve-and-invite operation.
#[derive(Debug, Clone)]
pub enum ApproveOutcome {
    Approved {
        request: MembershipRequestEntity,
        invite: InviteEntity,
    },
    NotFound,
    InvalidTransition(MembershipRequestEntity),
}

/// Repository for membership request operations.
#[derive(Clone)]
pub struct MembershipRequestRepository {
    pool: PgPool,
}

impl MembershipRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new application with status pending. Resubmission by the
    /// same email is allowed and creates an independent record.
    pub async fn create(
        &self,
        full_name: &str,
        email: &str,
        phone: Option<&str>,
        department: Option<&str>,
        skills: &[String],
        reason: Option<&str>,
    ) -> Result<MembershipRequestEntity, sqlx::Error> {
        sqlx::query_as::<_, MembershipRequestEntity>(&format!(
            r#"
            INSERT INTO requests (id, full_name, email, phone, department, skills, reason, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(email)
        .bind(phone)
        .bind(department)
        .bind(skills)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<MembershipRequestEntity>, sqlx::Error> {
        sqlx::query_as::<_, MembershipRequestEntity>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM requests
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Lists applications newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MembershipRequestEntity>, sqlx::Error> {
        match status {
            Some(status) => {
                sqlx::query_as::<_, MembershipRequestEntity>(&format!(
                    r#"
                    SELECT {REQUEST_COLUMNS}
                    FROM requests
                    WHERE status = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                ))
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MembershipRequestEntity>(&format!(
                    r#"
                    SELECT {REQUEST_COLUMNS}
                    FROM requests
                    ORDER BY created_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// Transitions a pending request to a terminal status.
    ///
    /// The `status = 'pending'` predicate makes the transition conditional:
    /// a request already in a terminal state is left untouched and reported
    /// as `InvalidTransition`.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<SetStatusOutcome, sqlx::Error> {
        let updated = sqlx::query_as::<_, MembershipRequestEntity>(&format!(
            r#"
            UPDATE requests
            SET status = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(entity) = updated {
            return Ok(SetStatusOutcome::Updated(entity));
        }
        match self.find_by_id(id).await? {
            None => Ok(SetStatusOutcome::NotFound),
            Some(entity) => Ok(SetStatusOutcome::InvalidTransition(entity)),
        }
    }

    /// Approves a request and issues its invite as one logical unit.
    ///
    /// Both writes share a transaction: a failed invite insert rolls the
    /// approval back, so the store never holds an approved request without
    /// its invite. Either side's failure surfaces to the caller for retry.
    pub async fn approve_and_invite(
        &self,
        id: Uuid,
        token: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<ApproveOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let approved = sqlx::query_as::<_, MembershipRequestEntity>(&format!(
            r#"
            UPDATE requests
            SET status = 'approved'
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = approved else {
            tx.rollback().await?;
            return match self.find_by_id(id).await? {
                None => Ok(ApproveOutcome::NotFound),
                Some(entity) => Ok(ApproveOutcome::InvalidTransition(entity)),
            };
        };

        let invite = sqlx::query_as::<_, InviteEntity>(
            r#"
            INSERT INTO invites (token, email, full_name, request_id, used, created_at, expires_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            RETURNING token, email, full_name, request_id, used, created_at, expires_at
            "#,
        )
        .bind(token)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(request.id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ApproveOutcome::Approved { request, invite })
    }
}
