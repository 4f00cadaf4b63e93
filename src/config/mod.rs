//! Configuration module for Switchyard
//!
//! One TOML file (path from `--config` or `SWITCHYARD_CONFIG`) is read into
//! [`SwitchyardConfig`]; every section is optional and falls back to its
//! defaults. [`SwitchyardConfig::with_env_overrides`] then applies
//! `SWITCHYARD_LOG_LEVEL`, `SWITCHYARD_LOG_FORMAT` and `SWITCHYARD_MODE`.
//! There are no per-setting command-line overrides.
//!
//! # Example
//!
//! ```rust
//! use switchyard::config::SwitchyardConfig;
//!
//! let toml = r#"
//! [routing]
//! max_chain_length = 3
//!
//! [[agents]]
//! id = "codex"
//! class = "cli"
//! "#;
//! let config: SwitchyardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.routing.max_chain_length, 3);
//! assert_eq!(config.agents.len(), 1);
//! ```

pub mod agent;
pub mod cost;
pub mod error;
pub mod logging;
pub mod modes;
pub mod orchestrator;
pub mod queue;
pub mod rate_limit;
pub mod routing;

pub use agent::AgentConfig;
pub use cost::CostConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use modes::{ModeOverride, ModesConfig};
pub use orchestrator::{OrchestratorConfig, TimeoutConfig, VerificationConfig};
pub use queue::QueueConfig;
pub use rate_limit::{RateLimitConfig, RateLimitsConfig};
pub use routing::RoutingConfig;

// Re-export HealthConfig from health module
pub use crate::health::HealthConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitchyardConfig {
    pub logging: LoggingConfig,
    pub health: HealthConfig,
    pub rate_limits: RateLimitsConfig,
    pub queue: QueueConfig,
    pub cost: CostConfig,
    pub routing: RoutingConfig,
    pub orchestrator: OrchestratorConfig,
    pub modes: ModesConfig,
    /// Agents registered at startup
    pub agents: Vec<AgentConfig>,
}

impl SwitchyardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SWITCHYARD_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Ok(mode) = std::env::var("SWITCHYARD_MODE") {
            if let Ok(m) = mode.parse() {
                self.modes.default = m;
            }
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.health
            .validate()
            .map_err(|message| ConfigError::validation("health", message))?;

        self.rate_limits
            .validate()
            .map_err(|(class, message)| {
                ConfigError::validation(format!("rate_limits.{}", class), message)
            })?;

        self.orchestrator
            .timeouts
            .validate()
            .map_err(|(field, message)| {
                ConfigError::validation(format!("orchestrator.timeouts.{}", field), message)
            })?;

        if self.queue.batch_size == 0 {
            return Err(ConfigError::validation(
                "queue.batch_size",
                "batch_size must be > 0",
            ));
        }

        self.cost
            .validate()
            .map_err(|message| ConfigError::validation("cost", message))?;

        if self.routing.max_chain_length == 0 {
            return Err(ConfigError::validation(
                "routing.max_chain_length",
                "chain must hold at least one agent",
            ));
        }

        self.modes
            .resolve()
            .map_err(|message| ConfigError::validation("modes.overrides", message))?;

        let mut seen = HashSet::new();
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("agents[{}].id", i),
                    "id cannot be empty",
                ));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigError::DuplicateAgent(agent.id.clone()));
            }
        }

        if let Some(default) = &self.cost.default_backend {
            if !self.agents.is_empty() && !seen.contains(default.as_str()) {
                return Err(ConfigError::validation(
                    "cost.default_backend",
                    format!("'{}' is not a configured agent", default),
                ));
            }
        }

        Ok(())
    }
}
