//! Operational mode configuration

use crate::mode::{ModeConfig, OperationalMode};
use crate::registry::AgentClass;
use crate::routing::RoutingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Partial override of one mode's built-in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeOverride {
    pub allowed_classes: Option<Vec<AgentClass>>,
    pub routing_strategy: Option<RoutingStrategy>,
    pub cross_verification: Option<bool>,
}

impl ModeOverride {
    /// Apply the set fields on top of `base`.
    pub fn apply(&self, mut base: ModeConfig) -> ModeConfig {
        if let Some(classes) = &self.allowed_classes {
            base.allowed_classes = classes.clone();
        }
        if let Some(strategy) = self.routing_strategy {
            base.routing_strategy = strategy;
        }
        if let Some(verify) = self.cross_verification {
            base.cross_verification = verify;
        }
        base
    }
}

/// Startup mode and per-mode overrides.
///
/// # Example
///
/// ```toml
/// [modes]
/// default = "full-redundancy"
///
/// [modes.overrides.cli-only]
/// routing_strategy = "capability_match"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModesConfig {
    /// Mode active at startup
    pub default: OperationalMode,
    /// Overrides keyed by mode name
    pub overrides: HashMap<String, ModeOverride>,
}

impl ModesConfig {
    /// Effective configuration of every mode.
    pub fn resolve(&self) -> Result<HashMap<OperationalMode, ModeConfig>, String> {
        let mut resolved: HashMap<_, _> = OperationalMode::ALL
            .iter()
            .map(|mode| (*mode, mode.default_config()))
            .collect();

        for (name, over) in &self.overrides {
            let mode: OperationalMode = name.parse().map_err(|e: crate::mode::ModeError| e.to_string())?;
            if over
                .allowed_classes
                .as_ref()
                .is_some_and(|classes| classes.is_empty())
            {
                return Err(format!("mode '{}' must allow at least one class", name));
            }
            if let Some(base) = resolved.remove(&mode) {
                resolved.insert(mode, over.apply(base));
            }
        }
        Ok(resolved)
    }
}
