//! Cost prediction configuration

use crate::health::MAX_RETENTION_HOURS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost model and static pricing settings.
///
/// # Example
///
/// ```toml
/// [cost]
/// default_backend = "claude-hosted"
/// default_rate_per_1k = 0.01
///
/// [cost.rates]
/// claude-hosted = 0.015
/// codex-cli = 0.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Samples a backend needs before its model is trained
    pub min_samples: usize,
    /// Retrain after this many new samples
    pub retrain_every: usize,
    /// Retrain any model older than this
    pub retrain_interval_seconds: u64,
    /// Ridge regularization strength
    pub ridge_lambda: f64,
    /// Backend that savings are computed against
    pub default_backend: Option<String>,
    /// Static price per 1000 input tokens, by backend id
    pub rates: HashMap<String, f64>,
    /// Static price for backends without an entry in `rates`
    pub default_rate_per_1k: f64,
    /// Confidence reported for static-formula predictions
    pub fallback_confidence: f64,
    /// Upper bound on retained cost records
    pub max_records: usize,
    /// Cost records older than this are pruned
    pub retention_hours: u64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            retrain_every: 10,
            retrain_interval_seconds: 3600,
            ridge_lambda: 0.01,
            default_backend: None,
            rates: HashMap::new(),
            default_rate_per_1k: 0.01,
            fallback_confidence: 0.3,
            max_records: 10_000,
            retention_hours: 24 * 7,
        }
    }
}

impl CostConfig {
    /// Static price per 1000 input tokens for a backend.
    pub fn rate_for(&self, backend_id: &str) -> f64 {
        self.rates
            .get(backend_id)
            .copied()
            .unwrap_or(self.default_rate_per_1k)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ridge_lambda < 0.0 {
            return Err("ridge_lambda must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.fallback_confidence) {
            return Err("fallback_confidence must be within 0.0-1.0".to_string());
        }
        if let Some((id, _)) = self.rates.iter().find(|(_, rate)| **rate < 0.0) {
            return Err(format!("rate for '{}' must be >= 0", id));
        }
        if self.retention_hours == 0 || self.retention_hours > MAX_RETENTION_HOURS {
            return Err(format!(
                "retention_hours must be within 1-{}",
                MAX_RETENTION_HOURS
            ));
        }
        Ok(())
    }

    /// Record retention, clamped so an unvalidated config cannot overflow.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours.min(MAX_RETENTION_HOURS) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_lookup_falls_back_to_default() {
        let mut config = CostConfig::default();
        config.rates.insert("hosted-a".to_string(), 0.03);
        assert_eq!(config.rate_for("hosted-a"), 0.03);
        assert_eq!(config.rate_for("unknown"), 0.01);
    }

    #[test]
    fn huge_retention_is_clamped_not_overflowed() {
        let config = CostConfig {
            retention_hours: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(
            config.retention(),
            chrono::Duration::hours(MAX_RETENTION_HOURS as i64)
        );
    }

    #[test]
    fn negative_rate_is_invalid() {
        let mut config = CostConfig::default();
        config.rates.insert("x".to_string(), -1.0);
        assert!(config.validate().is_err());
    }
}
