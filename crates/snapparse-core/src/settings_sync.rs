use std::sync::Arc;

use snapparse_config::{Settings, SettingsError, SettingsStore};
use snapparse_host::{EventBus, EventName, Host, HostCommands, HostError, HostEvent, Listener};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("settings rejected: {0}")]
    Invalid(#[from] SettingsError),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Keeps the process-wide [`SettingsStore`] in step with the host
pub struct SettingsSync {
    host: Arc<dyn Host>,
    store: SettingsStore,
    events: Listener,
}

impl SettingsSync {
    pub fn new(host: Arc<dyn Host>, bus: &EventBus, store: SettingsStore) -> Self {
        Self {
            host,
            store,
            events: bus.listen(&[EventName::SettingsChanged]),
        }
    }

    /// Initial fetch; the store keeps defaults when the host can't answer
    pub async fn load(&self) -> Arc<Settings> {
        match self.host.get_settings().await {
            Ok(value) => {
                self.store.replace(Settings::from_value_or_default(value));
                tracing::info!("[SETTINGS] loaded from host");
            }
            Err(e) => tracing::warn!("[SETTINGS] get_settings failed, using defaults: {e}"),
        }
        self.store.snapshot()
    }

    /// Validate, persist through the host, then publish locally
    pub async fn save(&self, settings: Settings) -> Result<(), SaveError> {
        settings.validate()?;
        self.host.save_settings(settings.clone()).await?;
        self.store.replace(settings);
        Ok(())
    }

    /// A bad live update keeps the last good snapshot
    fn changed(&self, value: serde_json::Value) {
        match Settings::from_value(value) {
            Ok(settings) => {
                if !self.store.replace(settings) {
                    tracing::debug!("[SETTINGS] settings-changed carried no change");
                }
            }
            Err(e) => tracing::warn!("[SETTINGS] ignoring settings-changed: {e}"),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(HostEvent::SettingsChanged(value)) => {
                        tracing::debug!("[SETTINGS] settings-changed received");
                        self.changed(value);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    }
}
