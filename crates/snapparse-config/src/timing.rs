use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_flush_interval_ms() -> u64 {
    24
}

fn default_hint_debounce_ms() -> u64 {
    45
}

fn default_redelivery_delays_ms() -> Vec<u64> {
    vec![0, 150, 300]
}

/// Timer constants for the overlay, the stream flush and payload redelivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub flush_interval_ms: u64,
    pub hint_debounce_ms: u64,
    /// Delays after which `change-text` is emitted again, first entry is the immediate one
    pub redelivery_delays_ms: Vec<u64>,
}

impl TimingConfig {
    pub fn new() -> Self {
        let flush_interval_ms = env::var("SNAPPARSE_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_flush_interval_ms);

        let hint_debounce_ms = env::var("SNAPPARSE_HINT_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_hint_debounce_ms);

        let redelivery_delays_ms = env::var("SNAPPARSE_REDELIVERY_DELAYS_MS")
            .ok()
            .and_then(|v| parse_delays(&v))
            .unwrap_or_else(default_redelivery_delays_ms);

        Self {
            flush_interval_ms,
            hint_debounce_ms,
            redelivery_delays_ms,
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn hint_debounce(&self) -> Duration {
        Duration::from_millis(self.hint_debounce_ms)
    }

    pub fn redelivery_delays(&self) -> Vec<Duration> {
        self.redelivery_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            hint_debounce_ms: default_hint_debounce_ms(),
            redelivery_delays_ms: default_redelivery_delays_ms(),
        }
    }
}

/// Comma separated, ascending list; anything else falls back to defaults
fn parse_delays(raw: &str) -> Option<Vec<u64>> {
    let delays = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    let ascending = delays.windows(2).all(|pair| pair[0] <= pair[1]);
    (!delays.is_empty() && ascending).then_some(delays)
}
