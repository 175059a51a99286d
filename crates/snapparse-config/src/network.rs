use std::env;

use serde::{Deserialize, Serialize};

fn default_host_url() -> String {
    "ws://127.0.0.1:7420".to_string()
}

/// Where the native host listens for the command/event bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host_url: String,
}

impl NetworkConfig {
    pub fn new() -> Self {
        let host_url = env::var("SNAPPARSE_HOST_URL").unwrap_or_else(|_| default_host_url());

        Self { host_url }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host_url: default_host_url(),
        }
    }
}
