use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout enforced by the host; the UI never times out a stream itself
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            temperature: default_temperature(),
        }
    }
}
