//! Routing strategies for agent selection

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Routing strategy determines how an agent is selected from candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Lowest average response time among capable agents
    #[default]
    CapabilityMatch,

    /// Rotate through agents in a stable cyclic order
    RoundRobin,

    /// Lowest error rate, then lowest average response time
    PriorityBased,

    /// Lowest predicted cost
    CostOptimized,
}

impl RoutingStrategy {
    pub const ALL: [RoutingStrategy; 4] = [
        RoutingStrategy::CapabilityMatch,
        RoutingStrategy::RoundRobin,
        RoutingStrategy::PriorityBased,
        RoutingStrategy::CostOptimized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::CapabilityMatch => "capability_match",
            RoutingStrategy::RoundRobin => "round_robin",
            RoutingStrategy::PriorityBased => "priority_based",
            RoutingStrategy::CostOptimized => "cost_optimized",
        }
    }
}

impl FromStr for RoutingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        RoutingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| format!("Unknown routing strategy: {}", s))
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
