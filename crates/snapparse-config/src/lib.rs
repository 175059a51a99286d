use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use self::network::NetworkConfig;
use self::timing::TimingConfig;

pub mod network;
pub mod settings;
pub mod store;
pub mod timing;

pub use settings::{Settings, SettingsError};
pub use store::SettingsStore;

const APP_DIR: &str = "SnapParse";
const LOCAL_STORAGE_FILE: &str = "local-storage.json";

/// Process configuration, read from the environment once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub timing: TimingConfig,
    /// Backing file for the best-effort local storage channel
    pub storage_path: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        let storage_path = env::var("SNAPPARSE_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_path());

        Config {
            network: NetworkConfig::new(),
            timing: TimingConfig::new(),
            storage_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_storage_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(LOCAL_STORAGE_FILE)
}
