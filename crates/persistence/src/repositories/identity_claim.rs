//! Repository for identity claim database operations.

use chrono::Utc;
use sqlx::PgPool;
use tracing::warn;

use domain::models::role::Role;

use crate::entities::{IdentityClaimEntity, ProfileEntity};
use crate::notify::ProfileNotifier;

/// Repository for the server-held mirror of identity-provider claims.
#[derive(Clone)]
pub struct IdentityClaimRepository {
    pool: PgPool,
    notifier: ProfileNotifier,
}

impl IdentityClaimRepository {
    pub fn new(pool: PgPool, notifier: ProfileNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Upserts a claim for a uid and reconciles the authoritative role.
    ///
    /// Setting the `admin` claim also rewrites users.role in the same
    /// transaction, so the claim mirror and the role column cannot drift.
    /// The uid need not have a profile yet; the claim is recorded either
    /// way and the role applies once the profile exists.
    pub async fn set_claim(
        &self,
        uid: &str,
        claim_key: &str,
        claim_value: &str,
    ) -> Result<IdentityClaimEntity, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let claim = sqlx::query_as::<_, IdentityClaimEntity>(
            r#"
            INSERT INTO identity_claims (uid, claim_key, claim_value, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (uid, claim_key)
            DO UPDATE SET claim_value = EXCLUDED.claim_value, updated_at = EXCLUDED.updated_at
            RETURNING uid, claim_key, claim_value, updated_at
            "#,
        )
        .bind(uid)
        .bind(claim_key)
        .bind(claim_value)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let mut updated_profile = None;
        if claim_key == "admin" {
            let role = if claim_value == "true" {
                Role::Admin
            } else {
                Role::Member
            };
            updated_profile = sqlx::query_as::<_, ProfileEntity>(
                r#"
                UPDATE users
                SET role = $2
                WHERE id = $1
                RETURNING id, full_name, email, role, avatar_url, current_streak, xp, created_at
                "#,
            )
            .bind(uid)
            .bind(role.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if let Some(entity) = updated_profile {
            match entity.into_model() {
                Ok(profile) => self.notifier.publish(&profile),
                Err(err) => {
                    warn!(error = %err, "Skipping notification for unparseable profile row")
                }
            }
        }
        Ok(claim)
    }

    pub async fn find(
        &self,
        uid: &str,
        claim_key: &str,
    ) -> Result<Option<IdentityClaimEntity>, sqlx::Error> {
        sqlx::query_as::<_, IdentityClaimEntity>(
            r#"
            SELECT uid, claim_key, claim_value, updated_at
            FROM identity_claims
            WHERE uid = $1 AND claim_key = $2
            "#,
        )
        .bind(uid)
        .bind(claim_key)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_for_uid(&self, uid: &str) -> Result<Vec<IdentityClaimEntity>, sqlx::Error> {
        sqlx::query_as::<_, IdentityClaimEntity>(
            r#"
            SELECT uid, claim_key, claim_value, updated_at
            FROM identity_claims
            WHERE uid = $1
            ORDER BY claim_key
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await
    }
}
