//! Agent availability and strategy-based selection.

use super::RoutingStrategy;
use crate::health::HealthMonitor;
use crate::rate_limit::RateLimiter;
use crate::registry::{AgentDescriptor, Registry};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Predicted cost per agent id, used by the cost-optimized strategy.
pub type CostTable = HashMap<String, f64>;

fn cost_of(costs: &CostTable, agent: &AgentDescriptor) -> f64 {
    costs.get(&agent.id).copied().unwrap_or(f64::INFINITY)
}

fn by_latency(a: &AgentDescriptor, b: &AgentDescriptor) -> CmpOrdering {
    a.performance
        .avg_response_time_ms
        .total_cmp(&b.performance.avg_response_time_ms)
        .then_with(|| a.id.cmp(&b.id))
}

/// Selects agents and decides whether they can take work right now.
pub struct LoadBalancer {
    registry: Arc<Registry>,
    health: Arc<HealthMonitor>,
    rate_limiter: Arc<RateLimiter>,
    round_robin_counter: AtomicU64,
}

impl LoadBalancer {
    pub fn new(
        registry: Arc<Registry>,
        health: Arc<HealthMonitor>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            registry,
            health,
            rate_limiter,
            round_robin_counter: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// `active ∧ rate limiter admits the class ∧ ¬degraded`
    pub fn is_available(&self, agent: &AgentDescriptor) -> bool {
        agent.active
            && self.rate_limiter.can_call(agent.class)
            && !self.health.is_degraded(&agent.id)
    }

    /// Pick one of `candidates` with `strategy`.
    ///
    /// Always returns a member of `candidates`; an empty slice gives `None`.
    pub fn select<'a>(
        &self,
        candidates: &'a [AgentDescriptor],
        strategy: RoutingStrategy,
        costs: &CostTable,
    ) -> Option<&'a AgentDescriptor> {
        if candidates.is_empty() {
            return None;
        }

        match strategy {
            RoutingStrategy::CapabilityMatch => candidates.iter().min_by(|a, b| by_latency(a, b)),
            RoutingStrategy::RoundRobin => {
                let mut ordered: Vec<_> = candidates.iter().collect();
                ordered.sort_by(|a, b| a.id.cmp(&b.id));
                let counter = self.round_robin_counter.fetch_add(1, Ordering::Relaxed);
                let index = (counter % ordered.len() as u64) as usize;
                Some(ordered[index])
            }
            RoutingStrategy::PriorityBased => candidates.iter().min_by(|a, b| {
                a.performance
                    .error_rate
                    .total_cmp(&b.performance.error_rate)
                    .then_with(|| by_latency(a, b))
            }),
            RoutingStrategy::CostOptimized => candidates.iter().min_by(|a, b| {
                cost_of(costs, a)
                    .total_cmp(&cost_of(costs, b))
                    .then_with(|| by_latency(a, b))
            }),
        }
    }
}
