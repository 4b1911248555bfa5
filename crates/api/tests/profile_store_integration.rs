//! Integration tests for the profile repository and its live change feed.
//!
//! These tests require a running PostgreSQL instance.
//! Set TEST_DATABASE_URL environment variable or use docker-compose.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{create_test_pool, run_migrations, unique_test_email};
use domain::models::profile::{Profile, Streaks};
use domain::models::role::Role;
use domain::session::ProfileStore;
use persistence::notify::ProfileNotifier;
use persistence::repositories::ProfileRepository;

fn test_profile(uid: &str) -> Profile {
    Profile {
        id: uid.to_string(),
        full_name: "Test Member".to_string(),
        email: unique_test_email(),
        role: Role::Member,
        avatar_url: String::new(),
        streaks: Streaks { current: 0 },
        xp: 0,
        created_at: Utc::now(),
    }
}

fn unique_uid() -> String {
    format!("uid-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let repo = ProfileRepository::new(pool, ProfileNotifier::new());

    let uid = unique_uid();
    let profile = test_profile(&uid);

    assert!(repo.create_if_absent(&profile).await.unwrap());

    // The second write is a no-op and must not clobber the first.
    let mut duplicate = profile.clone();
    duplicate.full_name = "Impostor".to_string();
    assert!(!repo.create_if_absent(&duplicate).await.unwrap());

    let stored = repo.find_by_id(&uid).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Test Member");
}

#[tokio::test]
async fn test_fetch_maps_row_to_model() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let repo = ProfileRepository::new(pool, ProfileNotifier::new());

    let uid = unique_uid();
    repo.create_if_absent(&test_profile(&uid)).await.unwrap();

    let fetched = repo.fetch(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.id, uid);
    assert_eq!(fetched.role, Role::Member);
    assert_eq!(fetched.streaks.current, 0);

    assert!(repo.fetch(&unique_uid()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_updates_are_pushed_to_watchers() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let repo = Arc::new(ProfileRepository::new(pool, ProfileNotifier::new()));

    let uid = unique_uid();
    repo.create_if_absent(&test_profile(&uid)).await.unwrap();

    let mut updates = repo.watch(&uid);

    repo.update_details(&uid, "Renamed Member", "https://cdn.club.org/a.png")
        .await
        .unwrap();

    let pushed = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no update delivered")
        .unwrap();
    assert_eq!(pushed.full_name, "Renamed Member");
    assert_eq!(pushed.avatar_url, "https://cdn.club.org/a.png");
}

#[tokio::test]
async fn test_role_change_is_pushed_to_watchers() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let repo = ProfileRepository::new(pool, ProfileNotifier::new());

    let uid = unique_uid();
    repo.create_if_absent(&test_profile(&uid)).await.unwrap();

    let mut updates = repo.watch(&uid);
    repo.set_role(&uid, Role::Admin).await.unwrap();

    let pushed = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no update delivered")
        .unwrap();
    assert_eq!(pushed.role, Role::Admin);
}

#[tokio::test]
async fn test_update_unknown_profile_returns_none() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let repo = ProfileRepository::new(pool, ProfileNotifier::new());

    let result = repo
        .update_details(&unique_uid(), "Ghost", "")
        .await
        .unwrap();
    assert!(result.is_none());
}
