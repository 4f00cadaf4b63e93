//! Routing decisions and fallback chains.

use super::RoutingStrategy;
use crate::registry::AgentDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why and where a task was routed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub task_id: String,
    pub chosen_agent_id: String,
    pub strategy: RoutingStrategy,
    /// USD
    pub predicted_cost: f64,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// Remaining fallback agents in order
    pub alternatives: Vec<String>,
    pub reason: String,
    /// Predicted savings against the default backend (USD)
    pub savings: f64,
    pub timestamp: DateTime<Utc>,
}

/// Ordered agents to try for one task, primary first.
///
/// Holds descriptor snapshots taken at routing time, so registry changes do
/// not affect a task already in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackChain {
    agents: Vec<AgentDescriptor>,
}

impl FallbackChain {
    pub(crate) fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }

    pub fn primary(&self) -> Option<&AgentDescriptor> {
        self.agents.first()
    }

    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn ids(&self) -> Vec<String> {
        self.agents.iter().map(|agent| agent.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|agent| agent.id == agent_id)
    }
}

/// Result of routing one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub decision: RoutingDecision,
    pub chain: FallbackChain,
}
