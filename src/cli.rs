//! Command-line flags and logging setup shared by both binaries.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigError, PipelineConfig};

/// Flags common to `build-meta-builds` and `finalize-meta-builds`.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to configuration file (ignored when absent)
    #[arg(long, default_value = "./meta-builds.toml")]
    pub config: PathBuf,

    /// Data directory path [default: ./data, or data_dir from the config file]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Load configuration from the config file and environment, then apply
    /// command-line overrides.
    pub fn load_config(&self, env: &HashMap<String, String>) -> Result<PipelineConfig, ConfigError> {
        let mut config = PipelineConfig::load(Some(&self.config), env)?;
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}

/// Initialize tracing. `RUST_LOG` takes precedence over `log_level`.
pub fn init_tracing(log_level: &str, json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let json_layer = json_logs.then(|| tracing_subscriber::fmt::layer().json());
    let plain_layer = (!json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();
}
