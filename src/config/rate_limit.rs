//! Per-class rate limit configuration

use crate::registry::AgentClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sliding-window quota plus burst pool for one agent class.
///
/// # Example
///
/// ```toml
/// [rate_limits.cli]
/// max_calls = 135
/// window_seconds = 18000
/// burst_size = 10
/// burst_refill_per_minute = 0.1667
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// When false the class is unlimited
    pub enabled: bool,
    /// Calls allowed inside one window
    pub max_calls: u32,
    /// Sliding window length
    pub window_seconds: u64,
    /// Maximum burst tokens (also the initial pool)
    pub burst_size: u32,
    /// Burst tokens restored per minute; may be fractional
    pub burst_refill_per_minute: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_calls: 135,
            window_seconds: 5 * 60 * 60,
            burst_size: 10,
            burst_refill_per_minute: 10.0 / 60.0,
        }
    }
}

impl RateLimitConfig {
    /// Configuration for a class that is never limited.
    pub fn unlimited() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Rate limits for every agent class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitsConfig {
    pub cli: RateLimitConfig,
    pub hosted: RateLimitConfig,
    pub supervisory: RateLimitConfig,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            cli: RateLimitConfig::default(),
            hosted: RateLimitConfig {
                enabled: true,
                max_calls: 500,
                window_seconds: 60 * 60,
                burst_size: 20,
                burst_refill_per_minute: 1.0,
            },
            supervisory: RateLimitConfig::unlimited(),
        }
    }
}

impl RateLimitsConfig {
    pub fn for_class(&self, class: AgentClass) -> &RateLimitConfig {
        match class {
            AgentClass::Cli => &self.cli,
            AgentClass::Hosted => &self.hosted,
            AgentClass::Supervisory => &self.supervisory,
        }
    }

    pub fn validate(&self) -> Result<(), (AgentClass, String)> {
        for class in AgentClass::ALL {
            let config = self.for_class(class);
            if !config.enabled {
                continue;
            }
            if config.window_seconds == 0 {
                return Err((class, "window_seconds must be > 0".to_string()));
            }
            if config.burst_refill_per_minute < 0.0 {
                return Err((class, "burst_refill_per_minute must be >= 0".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_limit_cli_and_hosted_only() {
        let config = RateLimitsConfig::default();
        assert!(config.for_class(AgentClass::Cli).enabled);
        assert_eq!(config.cli.max_calls, 135);
        assert_eq!(config.cli.window(), Duration::from_secs(18_000));
        assert!(config.for_class(AgentClass::Hosted).enabled);
        assert!(!config.for_class(AgentClass::Supervisory).enabled);
    }

    #[test]
    fn partial_class_section_keeps_other_defaults() {
        let toml = r#"
        [cli]
        max_calls = 10
        "#;
        let config: RateLimitsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cli.max_calls, 10);
        assert_eq!(config.cli.burst_size, 10);
        assert_eq!(config.hosted.max_calls, 500);
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = RateLimitsConfig::default();
        config.hosted.window_seconds = 0;
        assert!(matches!(config.validate(), Err((AgentClass::Hosted, _))));

        // Disabled classes are not validated
        config.hosted.enabled = false;
        assert!(config.validate().is_ok());
    }
}
