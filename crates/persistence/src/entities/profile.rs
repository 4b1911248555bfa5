//! Profile entity (database row mapping for the users table).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;

use domain::models::profile::{Profile, Streaks};
use domain::models::role::Role;

/// Database row mapping for the users table. The id column holds the
/// identity provider's opaque uid.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: String,
    pub current_streak: i32,
    pub xp: i64,
    pub created_at: DateTime<Utc>,
}

impl ProfileEntity {
    pub fn into_model(self) -> Result<Profile, String> {
        let role = Role::from_str(&self.role)?;
        Ok(Profile {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            role,
            avatar_url: self.avatar_url,
            streaks: Streaks {
                current: self.current_streak,
            },
            xp: self.xp,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_model_maps_streak_struct() {
        let entity = ProfileEntity {
            id: "uid-1".to_string(),
            full_name: "Ada".to_string(),
            email: "a@x.com".to_string(),
            role: "admin".to_string(),
            avatar_url: String::new(),
            current_streak: 3,
            xp: 120,
            created_at: Utc::now(),
        };
        let profile = entity.into_model().unwrap();
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.streaks.current, 3);
        assert_eq!(profile.xp, 120);
    }

    #[test]
    fn test_into_model_rejects_unknown_role() {
        let entity = ProfileEntity {
            id: "uid-1".to_string(),
            full_name: "Ada".to_string(),
            email: "a@x.com".to_string(),
            role: "superuser".to_string(),
            avatar_url: String::new(),
            current_streak: 0,
            xp: 0,
            created_at: Utc::now(),
        };
        assert!(entity.into_model().is_err());
    }
}
