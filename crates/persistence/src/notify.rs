//! In-process profile change notifier.
//!
//! Backs the session manager's live profile subscription: repositories
//! publish every committed profile write here, and each session holds one
//! per-uid receiver. Channels are created lazily and pruned once the last
//! receiver is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use domain::models::profile::Profile;

const CHANNEL_CAPACITY: usize = 32;

/// Fan-out hub for profile updates, keyed by identity uid.
#[derive(Clone, Default)]
pub struct ProfileNotifier {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Profile>>>>,
}

impl ProfileNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to updates for one uid.
    pub fn subscribe(&self, uid: &str) -> broadcast::Receiver<Profile> {
        let mut channels = self.channels.lock().expect("notifier lock poisoned");
        channels
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes a committed profile write to any live subscribers.
    pub fn publish(&self, profile: &Profile) {
        let mut channels = self.channels.lock().expect("notifier lock poisoned");
        if let Some(sender) = channels.get(&profile.id) {
            if sender.send(profile.clone()).is_err() {
                // Last receiver dropped; reclaim the channel.
                channels.remove(&profile.id);
            }
        }
    }

    /// Number of uids with an open channel. Exposed for tests.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().expect("notifier lock poisoned").len()
    }
}
