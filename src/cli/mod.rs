//! CLI module for switchyard
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `agents` - List configured agents
//! - `modes` - List operational modes and their configuration
//! - `route` - Dry-run routing for a task
//! - `config` - Configuration utilities (init, validate)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Where would a large review go in hosted-only mode?
//! switchyard route --kind review --payload-size 100000 --mode hosted-only
//!
//! # Generate shell completions
//! switchyard completions bash > ~/.bash_completion.d/switchyard
//! ```

pub mod agents;
pub mod completions;
pub mod config;
pub mod modes;
pub mod output;
pub mod route;

pub use completions::handle_completions;
pub use config::{handle_config_init, handle_config_validate};

use crate::config::SwitchyardConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// switchyard - routing control plane for agent backends
#[derive(Parser, Debug)]
#[command(
    name = "switchyard",
    version,
    about = "Routing, fallback and rate-limit control plane for agent backends"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured agents
    Agents(AgentsArgs),
    /// List operational modes
    Modes(ModesArgs),
    /// Show where a task would be routed, without running it
    Route(RouteArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct AgentsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Filter by class (cli, hosted, supervisory)
    #[arg(long)]
    pub class: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ModesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Operation kind (e.g. review, refactor)
    #[arg(short, long, default_value = "task")]
    pub kind: String,

    /// Task content
    #[arg(long, default_value = "")]
    pub content: String,

    /// Payload size in bytes (defaults to the content length)
    #[arg(long)]
    pub payload_size: Option<usize>,

    /// Required capability (repeatable)
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,

    /// Complexity hint (1-10)
    #[arg(long)]
    pub complexity: Option<u8>,

    /// Route under this mode instead of the configured default
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
    /// Check a configuration file
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "switchyard.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load the configuration file if it exists, otherwise defaults, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<SwitchyardConfig, crate::config::ConfigError> {
    let config = if path.exists() {
        SwitchyardConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        SwitchyardConfig::default()
    };
    Ok(config.with_env_overrides())
}
