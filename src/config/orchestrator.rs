//! Fallback orchestration configuration

use crate::registry::AgentClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-attempt timeouts by agent class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub cli_seconds: u64,
    pub hosted_seconds: u64,
    pub supervisory_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cli_seconds: 30,
            hosted_seconds: 120,
            supervisory_seconds: 60,
        }
    }
}

impl TimeoutConfig {
    pub fn for_class(&self, class: AgentClass) -> Duration {
        let secs = match class {
            AgentClass::Cli => self.cli_seconds,
            AgentClass::Hosted => self.hosted_seconds,
            AgentClass::Supervisory => self.supervisory_seconds,
        };
        Duration::from_secs(secs)
    }

    /// A zero timeout would fail every attempt of its class immediately.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        for (field, secs) in [
            ("cli_seconds", self.cli_seconds),
            ("hosted_seconds", self.hosted_seconds),
            ("supervisory_seconds", self.supervisory_seconds),
        ] {
            if secs == 0 {
                return Err((field, format!("{} must be > 0", field)));
            }
        }
        Ok(())
    }
}

/// Cross-verification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Issue a second, live call to verify results in modes that request it
    pub enabled: bool,
    /// Require both a cli and a hosted attempt; when false, presence of
    /// both classes in the fallback chain is enough
    pub require_mixed_attempts: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_mixed_attempts: true,
        }
    }
}

/// Orchestrator configuration.
///
/// # Example
///
/// ```toml
/// [orchestrator.timeouts]
/// cli_seconds = 30
/// hosted_seconds = 120
///
/// [orchestrator.verification]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub timeouts: TimeoutConfig,
    pub verification: VerificationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_timeouts() {
        let config = TimeoutConfig::default();
        assert_eq!(config.for_class(AgentClass::Cli), Duration::from_secs(30));
        assert_eq!(config.for_class(AgentClass::Hosted), Duration::from_secs(120));
        assert_eq!(
            config.for_class(AgentClass::Supervisory),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn verification_can_be_disabled() {
        let config: OrchestratorConfig =
            toml::from_str("[verification]\nenabled = false").unwrap();
        assert!(!config.verification.enabled);
        assert!(config.verification.require_mixed_attempts);
    }
}
