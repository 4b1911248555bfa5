//! Repository for profile (users table) database operations.
//!
//! Every committed write is republished through the [`ProfileNotifier`], so
//! sessions holding a live subscription observe server-side mutations
//! without polling.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::warn;

use domain::models::profile::Profile;
use domain::models::role::Role;
use domain::session::{ProfileStore, StoreError};

use crate::entities::ProfileEntity;
use crate::notify::ProfileNotifier;

const PROFILE_COLUMNS: &str =
    "id, full_name, email, role, avatar_url, current_streak, xp, created_at";

/// Repository for profile operations.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
    notifier: ProfileNotifier,
}

impl ProfileRepository {
    pub fn new(pool: PgPool, notifier: ProfileNotifier) -> Self {
        Self { pool, notifier }
    }

    pub fn notifier(&self) -> &ProfileNotifier {
        &self.notifier
    }

    pub async fn find_by_id(&self, uid: &str) -> Result<Option<ProfileEntity>, sqlx::Error> {
        sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Creates the profile if absent. `ON CONFLICT DO NOTHING` makes the
    /// provisioning race benign: concurrent first sign-ins leave exactly one
    /// row, and the loser's write is a no-op.
    pub async fn create_if_absent(&self, profile: &Profile) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, role, avatar_url, current_streak, xp, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(&profile.avatar_url)
        .bind(profile.streaks.current)
        .bind(profile.xp)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            self.notifier.publish(profile);
        }
        Ok(inserted)
    }

    /// Updates the self-service fields owned by the profile's subject.
    pub async fn update_details(
        &self,
        uid: &str,
        full_name: &str,
        avatar_url: &str,
    ) -> Result<Option<ProfileEntity>, sqlx::Error> {
        let updated = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            UPDATE users
            SET full_name = $2, avatar_url = $3
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#,
        ))
        .bind(uid)
        .bind(full_name)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?;

        self.publish_entity(updated.clone());
        Ok(updated)
    }

    /// Sets the authoritative role on the profile. Admin-only path.
    pub async fn set_role(
        &self,
        uid: &str,
        role: Role,
    ) -> Result<Option<ProfileEntity>, sqlx::Error> {
        let updated = sqlx::query_as::<_, ProfileEntity>(&format!(
            r#"
            UPDATE users
            SET role = $2
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#,
        ))
        .bind(uid)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.publish_entity(updated.clone());
        Ok(updated)
    }

    fn publish_entity(&self, entity: Option<ProfileEntity>) {
        if let Some(entity) = entity {
            match entity.into_model() {
                Ok(profile) => self.notifier.publish(&profile),
                Err(err) => warn!(error = %err, "Skipping notification for unparseable profile row"),
            }
        }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn fetch(&self, uid: &str) -> Result<Option<Profile>, StoreError> {
        let entity = self
            .find_by_id(uid)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        entity
            .map(|e| e.into_model().map_err(StoreError::Storage))
            .transpose()
    }

    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        self.create_if_absent(profile)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn watch(&self, uid: &str) -> broadcast::Receiver<Profile> {
        self.notifier.subscribe(uid)
    }
}
