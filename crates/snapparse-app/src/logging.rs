use std::env;
use std::sync::Arc;

use snapparse_config::Settings;
use snapparse_config::settings::LogLevel;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

const DEFAULT_DIRECTIVE: &str = "info";

/// Filter directive and whether it was chosen explicitly
///
/// `RUST_LOG` beats the CLI flag; with neither the settings level is
/// allowed to take over later.
pub fn resolve_directive(rust_log: Option<String>, cli_level: Option<&str>) -> (String, bool) {
    let explicit = rust_log
        .filter(|v| !v.trim().is_empty())
        .or_else(|| cli_level.map(str::to_string));
    match explicit {
        Some(directive) => (directive, true),
        None => (DEFAULT_DIRECTIVE.to_string(), false),
    }
}

/// Lets the user's settings drive the filter unless it was pinned at startup
#[derive(Clone)]
pub struct LogHandle {
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

pub fn init(cli_level: Option<&str>, json: bool) -> LogHandle {
    let (directive, pinned) = resolve_directive(env::var("RUST_LOG").ok(), cli_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directive:?} ({e}), using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();

    LogHandle {
        reload: (!pinned).then_some(handle),
    }
}

impl LogHandle {
    pub fn follow(&self, level: LogLevel) {
        let Some(handle) = &self.reload else {
            return;
        };
        if let Err(e) = handle.reload(EnvFilter::new(level.as_directive())) {
            tracing::warn!("failed to apply log level {}: {e}", level.as_directive());
        }
    }

    /// Track `advanced.logLevel` for as long as the app runs
    pub async fn follow_settings(
        self,
        mut settings: watch::Receiver<Arc<Settings>>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        if self.reload.is_none() {
            return Ok(());
        }
        let mut current = settings.borrow_and_update().advanced.log_level;
        self.follow(current);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let level = settings.borrow_and_update().advanced.log_level;
                    if level != current {
                        tracing::info!("log level -> {}", level.as_directive());
                        current = level;
                        self.follow(level);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_wins_over_flag() {
        let (directive, pinned) =
            resolve_directive(Some("snapparse_core=trace".into()), Some("warn"));
        assert_eq!(directive, "snapparse_core=trace");
        assert!(pinned);
    }

    #[test]
    fn test_flag_used_when_rust_log_is_blank() {
        let (directive, pinned) = resolve_directive(Some("  ".into()), Some("warn"));
        assert_eq!(directive, "warn");
        assert!(pinned);
    }

    #[test]
    fn test_default_leaves_room_for_settings() {
        let (directive, pinned) = resolve_directive(None, None);
        assert_eq!(directive, "info");
        assert!(!pinned);
    }
}
