use std::sync::Arc;

use tokio::sync::watch;

use crate::settings::Settings;

/// Process-wide settings snapshot
///
/// Consumers hold a clone of the store and either read `snapshot()` or
/// `subscribe()` for change notification. Snapshots are immutable; a change
/// replaces the whole value.
#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Arc<Settings>>>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    /// Publish a new snapshot; subscribers are only woken when it differs
    ///
    /// Returns whether the stored value changed.
    pub fn replace(&self, settings: Settings) -> bool {
        self.tx.send_if_modified(|current| {
            if **current == settings {
                return false;
            }
            *current = Arc::new(settings);
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
