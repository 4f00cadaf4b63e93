//! Task routing and agent selection
//!
//! Builds the candidate set for a task from the registry and the live mode,
//! asks the cost predictor and health monitor for scoring inputs, picks a
//! primary with the mode's strategy and orders the rest into a fallback chain.

mod balancer;
mod decision;
mod error;
mod history;
mod strategies;


pub use balancer::{CostTable, LoadBalancer};
pub use decision::{FallbackChain, Route, RoutingDecision};
pub use error::RoutingError;
pub use history::{RoutingHistory, RoutingRecord};
pub use strategies::RoutingStrategy;

use crate::config::RoutingConfig;
use crate::cost::{CostPredictor, TaskFeatures};
use crate::mode::{ModeConfig, OperationalMode};
use crate::registry::{AgentClass, AgentDescriptor};
use crate::task::Task;
use chrono::Utc;
use std::sync::Arc;

/// Router selects the primary agent and fallback chain for each task
pub struct Router {
    balancer: LoadBalancer,
    cost: Arc<CostPredictor>,
    config: RoutingConfig,
    history: RoutingHistory,
}

impl Router {
    pub fn new(balancer: LoadBalancer, cost: Arc<CostPredictor>, config: RoutingConfig) -> Self {
        let history = RoutingHistory::new(config.history_capacity);
        Self {
            balancer,
            cost,
            config,
            history,
        }
    }

    pub fn balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    pub fn history(&self) -> &RoutingHistory {
        &self.history
    }

    /// Class preference for a payload: small payloads go to quota-bound cli
    /// agents first, large ones to hosted APIs first. Supervisory is last.
    pub fn class_preference(&self, payload_size: usize, allowed: &[AgentClass]) -> Vec<AgentClass> {
        let order = if payload_size >= self.config.large_payload_threshold {
            [AgentClass::Hosted, AgentClass::Cli, AgentClass::Supervisory]
        } else {
            [AgentClass::Cli, AgentClass::Hosted, AgentClass::Supervisory]
        };
        order
            .into_iter()
            .filter(|class| allowed.contains(class))
            .collect()
    }

    /// Active agents of an allowed class with every required capability.
    pub fn candidates(&self, task: &Task, mode_config: &ModeConfig) -> Vec<AgentDescriptor> {
        self.balancer
            .registry()
            .all()
            .into_iter()
            .filter(|agent| {
                agent.active
                    && mode_config.allowed_classes.contains(&agent.class)
                    && agent.has_capabilities(&task.required_capabilities)
            })
            .collect()
    }

    /// Route `task` under `mode`. Does not record history.
    pub fn route(
        &self,
        task: &Task,
        mode: OperationalMode,
        mode_config: &ModeConfig,
    ) -> Result<Route, RoutingError> {
        let candidates = self.candidates(task, mode_config);
        if candidates.is_empty() {
            tracing::warn!(
                task_id = %task.id,
                mode = %mode,
                required = ?task.required_capabilities,
                "No candidate agents"
            );
            return Err(RoutingError::NoCandidates {
                task_id: task.id.clone(),
                mode,
                required: task.required_capabilities.clone(),
            });
        }

        let features = TaskFeatures::from_task(task);
        let ids: Vec<&str> = candidates.iter().map(|agent| agent.id.as_str()).collect();
        let predictions = self.cost.predict_costs(&features, &ids);
        let costs: CostTable = predictions
            .iter()
            .map(|p| (p.backend.clone(), p.predicted_cost))
            .collect();

        let preference = self.class_preference(task.payload_size, &mode_config.allowed_classes);
        let rank = |class: AgentClass| {
            preference
                .iter()
                .position(|c| *c == class)
                .unwrap_or(preference.len())
        };
        let chain_order = |a: &AgentDescriptor, b: &AgentDescriptor| {
            rank(a.class)
                .cmp(&rank(b.class))
                .then_with(|| {
                    costs
                        .get(&a.id)
                        .copied()
                        .unwrap_or(f64::INFINITY)
                        .total_cmp(&costs.get(&b.id).copied().unwrap_or(f64::INFINITY))
                })
                .then_with(|| {
                    a.performance
                        .avg_response_time_ms
                        .total_cmp(&b.performance.avg_response_time_ms)
                })
                .then_with(|| a.id.cmp(&b.id))
        };

        let (mut available, mut unavailable): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|agent| self.balancer.is_available(agent));
        available.sort_by(&chain_order);
        unavailable.sort_by(&chain_order);

        let strategy = mode_config.routing_strategy;
        let (primary, reason) = if available.is_empty() {
            (
                unavailable.first().cloned(),
                "no available agent, trying rate-limited or degraded agents".to_string(),
            )
        } else if strategy == RoutingStrategy::CostOptimized {
            (
                self.balancer.select(&available, strategy, &costs).cloned(),
                format!("{}: lowest predicted cost across allowed classes", strategy),
            )
        } else {
            let class = preference
                .iter()
                .copied()
                .find(|class| available.iter().any(|agent| agent.class == *class));
            let pool: Vec<_> = available
                .iter()
                .filter(|agent| Some(agent.class) == class)
                .cloned()
                .collect();
            let reason = match class {
                Some(class) => format!("{} within preferred class {}", strategy, class),
                None => strategy.to_string(),
            };
            (self.balancer.select(&pool, strategy, &costs).cloned(), reason)
        };

        // Candidates are non-empty, so one of the branches above found an agent
        let Some(primary) = primary else {
            return Err(RoutingError::NoCandidates {
                task_id: task.id.clone(),
                mode,
                required: task.required_capabilities.clone(),
            });
        };

        let mut agents = Vec::with_capacity(available.len() + unavailable.len());
        agents.push(primary.clone());
        agents.extend(
            available
                .into_iter()
                .chain(unavailable)
                .filter(|agent| agent.id != primary.id),
        );
        agents.truncate(self.config.max_chain_length.max(1));
        let chain = FallbackChain::new(agents);

        let chosen = predictions
            .iter()
            .find(|p| p.backend == primary.id)
            .cloned()
            .unwrap_or_else(|| self.cost.predict(&primary.id, &features));
        let baseline = self
            .cost
            .baseline_cost(&features, &predictions)
            .unwrap_or(chosen.predicted_cost);

        let decision = RoutingDecision {
            task_id: task.id.clone(),
            chosen_agent_id: primary.id.clone(),
            strategy,
            predicted_cost: chosen.predicted_cost,
            confidence: chosen.confidence,
            alternatives: chain.ids().into_iter().skip(1).collect(),
            reason,
            savings: baseline - chosen.predicted_cost,
            timestamp: Utc::now(),
        };

        tracing::debug!(
            task_id = %task.id,
            mode = %mode,
            strategy = %strategy,
            agent_id = %decision.chosen_agent_id,
            chain = ?decision.alternatives,
            predicted_cost = decision.predicted_cost,
            "Task routed"
        );

        Ok(Route { decision, chain })
    }

    /// Record a decision in the routing history.
    pub fn record(&self, decision: &RoutingDecision, mode: OperationalMode) {
        self.history.push(RoutingRecord {
            task_id: decision.task_id.clone(),
            agent_id: decision.chosen_agent_id.clone(),
            mode,
            timestamp: decision.timestamp,
        });
    }
}
