//! CLI command definitions for the `codesensei` binary.

pub mod config;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use codesensei_infra::config::{apply_env_overrides, default_config_path, load_config, process_env};
use codesensei_types::config::SenseiConfig;

/// Socratic coding-tutor chat backend.
#[derive(Parser)]
#[command(name = "codesensei", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Address to bind (overrides `server.host`).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides `server.port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Config file (default: `<data dir>/config.toml`).
        #[arg(long, env = "CODESENSEI_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the resolved configuration as JSON.
    Config {
        /// Config file (default: `<data dir>/config.toml`).
        #[arg(long, env = "CODESENSEI_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Load the config file and apply environment overrides.
pub async fn resolve_config(path: Option<&Path>, data_dir: &Path) -> SenseiConfig {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(data_dir));
    let mut config = load_config(&path).await;
    apply_env_overrides(&mut config, process_env);
    config
}
