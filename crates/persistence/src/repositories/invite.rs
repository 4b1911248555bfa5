//! Repository for invite database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::InviteEntity;

const INVITE_COLUMNS: &str = "token, email, full_name, request_id, used, created_at, expires_at";

/// Outcome of a redemption attempt.
#[derive(Debug, Clone)]
pub enum RedeemOutcome {
    /// The conditional write flipped `used` from false to true.
    Redeemed(InviteEntity),
    NotFound,
    Expired,
    AlreadyUsed,
}

/// Repository for invite operations.
#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a new invite. `created_at` and `expires_at` are computed by
    /// the caller from one clock read so the TTL is exact.
    pub async fn create(
        &self,
        token: &str,
        email: &str,
        full_name: Option<&str>,
        request_id: Option<Uuid>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<InviteEntity, sqlx::Error> {
        sqlx::query_as::<_, InviteEntity>(&format!(
            r#"
            INSERT INTO invites (token, email, full_name, request_id, used, created_at, expires_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            RETURNING {INVITE_COLUMNS}
            "#,
        ))
        .bind(token)
        .bind(email)
        .bind(full_name)
        .bind(request_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Finds an invite by its token.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<InviteEntity>, sqlx::Error> {
        sqlx::query_as::<_, InviteEntity>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invites
            WHERE token = $1
            "#,
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Redeems an invite with a single conditional write.
    ///
    /// The `used = FALSE AND expires_at > NOW()` predicate makes consumption
    /// atomic: of two concurrent redemptions, exactly one updates a row and
    /// the other classifies its failure from a follow-up read. There is no
    /// separate read-then-write window.
    pub async fn redeem(&self, token: &str) -> Result<RedeemOutcome, sqlx::Error> {
        let redeemed = sqlx::query_as::<_, InviteEntity>(&format!(
            r#"
            UPDATE invites
            SET used = TRUE
            WHERE token = $1 AND used = FALSE AND expires_at > NOW()
            RETURNING {INVITE_COLUMNS}
            "#,
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(entity) = redeemed {
            return Ok(RedeemOutcome::Redeemed(entity));
        }

        // The conditional write matched nothing; classify why.
        match self.find_by_token(token).await? {
            None => Ok(RedeemOutcome::NotFound),
            Some(entity) if Utc::now() > entity.expires_at => Ok(RedeemOutcome::Expired),
            Some(_) => Ok(RedeemOutcome::AlreadyUsed),
        }
    }

    /// Lists invites newest first, optionally excluding consumed ones.
    /// Invites are never deleted, so this is the audit view.
    pub async fn list(
        &self,
        include_used: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InviteEntity>, sqlx::Error> {
        let query = if include_used {
            format!(
                r#"
                SELECT {INVITE_COLUMNS}
                FROM invites
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
        } else {
            format!(
                r#"
                SELECT {INVITE_COLUMNS}
                FROM invites
                WHERE used = FALSE
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
        };

        sqlx::query_as::<_, InviteEntity>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }
}
