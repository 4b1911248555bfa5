//! The session manager state machine.
//!
//! Owns at most one live profile subscription at a time. Every identity
//! transition bumps a generation counter and cancels the previous resolver
//! task, so a delivery from a stale subscription can never leak a previous
//! user's profile into the current session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::store::{IdentityProvider, ProfileStore, StoreError};
use super::{AuthEvent, Identity, Session};
use crate::models::profile::Profile;

/// Upper bound on the initial profile read after sign-in. A slow store
/// surfaces as a degraded (profile-less) session instead of hanging the
/// caller in a perpetual loading state.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Reconciles identity-provider events with the profile store and publishes
/// the resulting session snapshots on a watch channel.
pub struct SessionManager {
    store: Arc<dyn ProfileStore>,
    provider: Arc<dyn IdentityProvider>,
    state_tx: watch::Sender<Session>,
    generation: AtomicU64,
    active: Mutex<Option<JoinHandle<()>>>,
    fetch_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ProfileStore>, provider: Arc<dyn IdentityProvider>) -> Arc<Self> {
        Self::with_fetch_timeout(store, provider, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_fetch_timeout(
        store: Arc<dyn ProfileStore>,
        provider: Arc<dyn IdentityProvider>,
        fetch_timeout: Duration,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(Session::default());
        Arc::new(Self {
            store,
            provider,
            state_tx,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            fetch_timeout,
        })
    }

    /// Subscribes to session snapshots. The receiver starts at the current
    /// snapshot and observes every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state_tx.subscribe()
    }

    /// Returns the current session snapshot.
    pub fn current(&self) -> Session {
        self.state_tx.borrow().clone()
    }

    /// Consumes identity-provider events until the provider channel closes.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.provider.events();
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn(identity)) => self.handle_sign_in(identity),
                Ok(AuthEvent::SignedOut) => self.handle_sign_out(),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session manager lagged behind auth events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Ends the provider session and clears the local profile. The provider
    /// is expected to emit `SignedOut`, which finishes the transition.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.provider.sign_out().await?;
        self.state_tx.send_modify(|session| {
            session.profile = None;
        });
        Ok(())
    }

    /// Forces a one-shot re-read of the current identity's profile.
    ///
    /// Used after side-channel mutations that bypass the live subscription.
    /// Doubles as next-read repair: if the store has no row but the session
    /// holds a provisioned profile, the persist is re-issued.
    pub async fn refresh(&self) {
        let snapshot = self.current();
        let Some(identity) = snapshot.identity else {
            return;
        };
        let gen = self.generation.load(Ordering::SeqCst);

        match tokio::time::timeout(self.fetch_timeout, self.store.fetch(&identity.uid)).await {
            Ok(Ok(Some(profile))) => {
                self.publish_if_current(gen, |session| {
                    session.profile = Some(profile);
                    session.loading = false;
                });
            }
            Ok(Ok(None)) => {
                if let Some(local) = snapshot.profile {
                    info!(uid = %identity.uid, "Re-issuing missing profile write");
                    if let Err(err) = self.store.create(&local).await {
                        error!(uid = %identity.uid, error = %err, "Profile repair write failed");
                    }
                }
            }
            Ok(Err(err)) => {
                warn!(uid = %identity.uid, error = %err, "Profile refresh failed");
            }
            Err(_) => {
                warn!(uid = %identity.uid, "Profile refresh timed out");
            }
        }
    }

    fn handle_sign_in(self: &Arc<Self>, identity: Identity) {
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_active();

        debug!(uid = %identity.uid, "Identity signed in, resolving profile");
        self.publish_if_current(gen, |session| {
            session.identity = Some(identity.clone());
            session.profile = None;
            session.loading = true;
        });

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.resolve_and_sync(identity, gen).await;
        });
        *self.active.lock().expect("session lock poisoned") = Some(handle);
    }

    fn handle_sign_out(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_active();
        self.state_tx.send_modify(|session| {
            session.identity = None;
            session.profile = None;
            session.loading = false;
        });
        debug!("Identity signed out, session cleared");
    }

    async fn resolve_and_sync(self: Arc<Self>, identity: Identity, gen: u64) {
        // Subscribe before the initial read so a write landing in between is
        // not missed.
        let mut updates = self.store.watch(&identity.uid);

        match tokio::time::timeout(self.fetch_timeout, self.store.fetch(&identity.uid)).await {
            Ok(Ok(Some(profile))) => {
                self.publish_if_current(gen, |session| {
                    session.profile = Some(profile);
                    session.loading = false;
                });
            }
            Ok(Ok(None)) => {
                let profile = Profile::provisioned(&identity, Utc::now());
                info!(uid = %identity.uid, "No profile found, provisioning default member");

                // Local state resolves immediately; the persist runs
                // detached so first paint never waits on the write.
                self.publish_if_current(gen, |session| {
                    session.profile = Some(profile.clone());
                    session.loading = false;
                });

                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    if let Err(err) = store.create(&profile).await {
                        error!(uid = %profile.id, error = %err, "Profile provisioning write failed");
                    }
                });
            }
            Ok(Err(err)) => {
                warn!(uid = %identity.uid, error = %err, "Initial profile read failed");
                self.publish_if_current(gen, |session| {
                    session.loading = false;
                });
            }
            Err(_) => {
                warn!(uid = %identity.uid, "Initial profile read timed out");
                self.publish_if_current(gen, |session| {
                    session.loading = false;
                });
            }
        }

        loop {
            match updates.recv().await {
                Ok(profile) => {
                    let applied = self.publish_if_current(gen, |session| {
                        session.profile = Some(profile.clone());
                        session.loading = false;
                    });
                    if !applied {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(uid = %identity.uid, skipped, "Profile subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Applies a state mutation only if `gen` is still the live generation.
    /// Returns whether the mutation was applied.
    fn publish_if_current(&self, gen: u64, mutate: impl FnOnce(&mut Session)) -> bool {
        let mut applied = false;
        self.state_tx.send_modify(|session| {
            if self.generation.load(Ordering::SeqCst) == gen {
                mutate(session);
                applied = true;
            }
        });
        applied
    }

    fn cancel_active(&self) {
        if let Some(handle) = self.active.lock().expect("session lock poisoned").take() {
            handle.abort();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(handle) = active.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// In-memory profile store with injectable latency and failures.
    #[derive(Default)]
    struct MemoryProfileStore {
        profiles: Mutex<HashMap<String, Profile>>,
        senders: Mutex<HashMap<String, broadcast::Sender<Profile>>>,
        fetch_delays: Mutex<HashMap<String, Duration>>,
        fail_creates: AtomicBool,
        fail_fetches: AtomicBool,
        create_count: AtomicUsize,
    }

    impl MemoryProfileStore {
        fn sender_for(&self, uid: &str) -> broadcast::Sender<Profile> {
            self.senders
                .lock()
                .unwrap()
                .entry(uid.to_string())
                .or_insert_with(|| broadcast::channel(16).0)
                .clone()
        }

        /// Writes a profile and pushes it to live subscribers.
        fn publish(&self, profile: Profile) {
            self.profiles
                .lock()
                .unwrap()
                .insert(profile.id.clone(), profile.clone());
            let _ = self.sender_for(&profile.id).send(profile);
        }

        /// Writes a profile without notifying subscribers, simulating a
        /// side-channel mutation that bypasses the live feed.
        fn set_silent(&self, profile: Profile) {
            self.profiles
                .lock()
                .unwrap()
                .insert(profile.id.clone(), profile);
        }

        fn delay_fetch(&self, uid: &str, delay: Duration) {
            self.fetch_delays
                .lock()
                .unwrap()
                .insert(uid.to_string(), delay);
        }

        fn get(&self, uid: &str) -> Option<Profile> {
            self.profiles.lock().unwrap().get(uid).cloned()
        }
    }

    #[async_trait]
    impl ProfileStore for MemoryProfileStore {
        async fn fetch(&self, uid: &str) -> Result<Option<Profile>, StoreError> {
            let delay = self.fetch_delays.lock().unwrap().get(uid).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_fetches.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            Ok(self.get(uid))
        }

        async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
            self.create_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_creates.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("store offline".to_string()));
            }
            self.profiles
                .lock()
                .unwrap()
                .entry(profile.id.clone())
                .or_insert_with(|| profile.clone());
            Ok(())
        }

        fn watch(&self, uid: &str) -> broadcast::Receiver<Profile> {
            self.sender_for(uid).subscribe()
        }
    }

    struct MockProvider {
        tx: broadcast::Sender<AuthEvent>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                tx: broadcast::channel(16).0,
            }
        }

        fn sign_in(&self, uid: &str) {
            let _ = self.tx.send(AuthEvent::SignedIn(identity(uid)));
        }
    }

    #[async_trait]
    impl IdentityProvider for MockProvider {
        fn events(&self) -> broadcast::Receiver<AuthEvent> {
            self.tx.subscribe()
        }

        async fn sign_out(&self) -> Result<(), StoreError> {
            let _ = self.tx.send(AuthEvent::SignedOut);
            Ok(())
        }
    }

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: Some(format!("{}@club.org", uid)),
            display_name: Some(format!("User {}", uid)),
        }
    }

    struct Fixture {
        store: Arc<MemoryProfileStore>,
        provider: Arc<MockProvider>,
        manager: Arc<SessionManager>,
        rx: watch::Receiver<Session>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryProfileStore::default());
        let provider = Arc::new(MockProvider::new());
        let store_dyn: Arc<dyn ProfileStore> = store.clone();
        let provider_dyn: Arc<dyn IdentityProvider> = provider.clone();
        let manager =
            SessionManager::with_fetch_timeout(store_dyn, provider_dyn, Duration::from_millis(500));
        let rx = manager.subscribe();
        tokio::spawn(Arc::clone(&manager).run());
        // Give the run loop a beat to subscribe to provider events.
        tokio::time::sleep(Duration::from_millis(10)).await;
        Fixture {
            store,
            provider,
            manager,
            rx,
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<Session>,
        pred: impl Fn(&Session) -> bool,
    ) -> Session {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let session = rx.borrow();
                    if pred(&session) {
                        return session.clone();
                    }
                }
                rx.changed().await.expect("session channel closed");
            }
        })
        .await
        .expect("timed out waiting for session state")
    }

    #[tokio::test]
    async fn provisions_default_profile_on_first_sign_in() {
        let mut fx = fixture().await;

        fx.provider.sign_in("alice");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;

        let profile = session.profile.unwrap();
        assert_eq!(profile.id, "alice");
        assert_eq!(profile.role, Role::Member);
        assert_eq!(profile.xp, 0);
        assert_eq!(profile.streaks.current, 0);
        assert_eq!(profile.email, "alice@club.org");
        assert!(!session.loading);

        // The detached write lands in the store.
        tokio::time::timeout(Duration::from_secs(1), async {
            while fx.store.get("alice").is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("provisioning write never landed");
        assert_eq!(fx.store.create_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_provision_twice_for_same_identity() {
        let mut fx = fixture().await;

        fx.provider.sign_in("bob");
        wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        tokio::time::timeout(Duration::from_secs(1), async {
            while fx.store.get("bob").is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        fx.manager.sign_out().await.unwrap();
        wait_for(&mut fx.rx, |s| s.identity.is_none() && !s.loading).await;

        fx.provider.sign_in("bob");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;

        assert_eq!(session.profile.unwrap().id, "bob");
        assert_eq!(fx.store.create_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sign_out_clears_identity_and_profile() {
        let mut fx = fixture().await;

        fx.provider.sign_in("carol");
        wait_for(&mut fx.rx, |s| s.profile.is_some()).await;

        fx.manager.sign_out().await.unwrap();
        let session = wait_for(&mut fx.rx, |s| s.identity.is_none() && !s.loading).await;
        assert!(session.profile.is_none());
    }

    #[tokio::test]
    async fn live_updates_flow_into_session() {
        let mut fx = fixture().await;

        fx.provider.sign_in("dave");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        let mut profile = session.profile.unwrap();

        profile.xp = 150;
        profile.streaks.current = 4;
        fx.store.publish(profile);

        let session = wait_for(&mut fx.rx, |s| {
            s.profile.as_ref().is_some_and(|p| p.xp == 150)
        })
        .await;
        assert_eq!(session.profile.unwrap().streaks.current, 4);
    }

    #[tokio::test]
    async fn stale_subscription_never_resurrects_previous_identity() {
        let mut fx = fixture().await;

        // A's profile exists but its initial read is slow; B resolves fast.
        fx.store.publish(Profile::provisioned(&identity("aaa"), Utc::now()));
        fx.store.publish(Profile::provisioned(&identity("bbb"), Utc::now()));
        fx.store.delay_fetch("aaa", Duration::from_millis(150));

        fx.provider.sign_in("aaa");
        tokio::time::sleep(Duration::from_millis(20)).await;
        fx.provider.sign_in("bbb");

        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        assert_eq!(session.profile.unwrap().id, "bbb");

        // Wait past A's delayed read; the session must still be B's.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let session = fx.manager.current();
        assert_eq!(session.identity.unwrap().uid, "bbb");
        assert_eq!(session.profile.unwrap().id, "bbb");
    }

    #[tokio::test]
    async fn updates_after_sign_out_are_discarded() {
        let mut fx = fixture().await;

        fx.provider.sign_in("erin");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        let mut profile = session.profile.unwrap();

        fx.manager.sign_out().await.unwrap();
        wait_for(&mut fx.rx, |s| s.identity.is_none() && !s.loading).await;

        profile.xp = 999;
        fx.store.publish(profile);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let session = fx.manager.current();
        assert!(session.identity.is_none());
        assert!(session.profile.is_none());
    }

    #[tokio::test]
    async fn fetch_failure_degrades_without_crashing() {
        let mut fx = fixture().await;
        fx.store.fail_fetches.store(true, Ordering::SeqCst);

        fx.provider.sign_in("frank");
        let session = wait_for(&mut fx.rx, |s| s.identity.is_some() && !s.loading).await;
        assert!(session.profile.is_none());
    }

    #[tokio::test]
    async fn refresh_repairs_missing_provisioning_write() {
        let mut fx = fixture().await;
        fx.store.fail_creates.store(true, Ordering::SeqCst);

        fx.provider.sign_in("grace");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        assert_eq!(session.profile.unwrap().id, "grace");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fx.store.get("grace").is_none());

        fx.store.fail_creates.store(false, Ordering::SeqCst);
        fx.manager.refresh().await;

        assert!(fx.store.get("grace").is_some());
    }

    #[tokio::test]
    async fn refresh_picks_up_side_channel_writes() {
        let mut fx = fixture().await;

        fx.provider.sign_in("heidi");
        let session = wait_for(&mut fx.rx, |s| s.profile.is_some()).await;
        let mut profile = session.profile.unwrap();

        profile.avatar_url = "https://cdn.club.org/avatars/heidi.png".to_string();
        fx.store.set_silent(profile);

        fx.manager.refresh().await;
        let session = fx.manager.current();
        assert_eq!(
            session.profile.unwrap().avatar_url,
            "https://cdn.club.org/avatars/heidi.png"
        );
    }
}
