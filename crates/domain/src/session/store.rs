//! Storage and identity-provider traits consumed by the session manager.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::AuthEvent;
use crate::models::profile::Profile;

/// Failure talking to the profile store or the identity provider.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Access to profile records plus a live change feed.
///
/// `watch` is a standing push subscription, not a one-shot read: every
/// server-side mutation routed through the store must be delivered to active
/// receivers in write order. Subscriptions are per-uid; dropping the receiver
/// ends the subscription.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, uid: &str) -> Result<Option<Profile>, StoreError>;

    /// Creates the profile if no record with its id exists yet. Creation is
    /// idempotent: a concurrent or repeated create for the same id leaves
    /// exactly one record.
    async fn create(&self, profile: &Profile) -> Result<(), StoreError>;

    fn watch(&self, uid: &str) -> broadcast::Receiver<Profile>;
}

/// Boundary to the external authentication identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribes to identity state changes.
    fn events(&self) -> broadcast::Receiver<AuthEvent>;

    /// Ends the current session with the provider. Expected to trigger a
    /// subsequent `AuthEvent::SignedOut`.
    async fn sign_out(&self) -> Result<(), StoreError>;
}
