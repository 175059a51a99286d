use std::path::PathBuf;

use clap::Parser;
use snapparse_config::Config;

#[derive(Parser, Debug)]
#[command(name = "snapparse", version, about = "Selection capture and streaming result pipeline")]
pub struct Cli {
    /// WebSocket url of the native host, overrides SNAPPARSE_HOST_URL
    #[arg(long)]
    pub host_url: Option<String>,

    /// Local storage file, overrides SNAPPARSE_STORAGE_PATH
    #[arg(long)]
    pub storage_path: Option<PathBuf>,

    /// Log filter directive, used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Flags win over whatever the environment configured
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.host_url {
            config.network.host_url = url.clone();
        }
        if let Some(path) = &self.storage_path {
            config.storage_path = path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use snapparse_config::network::NetworkConfig;
    use snapparse_config::timing::TimingConfig;

    use super::*;

    fn config() -> Config {
        Config {
            network: NetworkConfig::default(),
            timing: TimingConfig::default(),
            storage_path: PathBuf::from("/tmp/from-env.json"),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = Cli::parse_from([
            "snapparse",
            "--host-url",
            "ws://10.0.0.2:9000",
            "--log-level",
            "debug",
            "--log-json",
        ]);
        let mut config = config();
        cli.apply(&mut config);

        assert_eq!(config.network.host_url, "ws://10.0.0.2:9000");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/from-env.json"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.log_json);
    }

    #[test]
    fn test_no_flags_keep_environment() {
        let cli = Cli::parse_from(["snapparse"]);
        let mut config = config();
        cli.apply(&mut config);

        assert_eq!(config.network.host_url, "ws://127.0.0.1:7420");
        assert!(!cli.log_json);
    }
}
