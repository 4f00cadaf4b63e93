//! Routing configuration

use serde::{Deserialize, Serialize};

/// Load balancer and fallback chain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Payloads of at least this many bytes prefer hosted backends
    pub large_payload_threshold: usize,
    /// Maximum agents in a fallback chain, primary included
    pub max_chain_length: usize,
    /// Routing decisions kept for `get_routing_history`
    pub history_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            large_payload_threshold: 32 * 1024,
            max_chain_length: 5,
            history_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_config_defaults() {
        let config = RoutingConfig::default();
        assert_eq!(config.max_chain_length, 5);
        assert_eq!(config.history_capacity, 100);
    }

    #[test]
    fn routing_config_from_toml() {
        let config: RoutingConfig = toml::from_str("max_chain_length = 3").unwrap();
        assert_eq!(config.max_chain_length, 3);
        assert_eq!(config.large_payload_threshold, 32 * 1024);
    }
}
