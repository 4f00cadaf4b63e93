//! Control plane facade
//!
//! `ControlPlane` owns every shared component (registry, health monitor,
//! rate limiter, batch queue, cost predictor, router, mode manager and
//! orchestrator), wires them from configuration and exposes the operations
//! callers use.
//!
//! # Example
//!
//! ```no_run
//! # async fn run(executor: std::sync::Arc<dyn switchyard::agent::BackendExecutor>) {
//! use switchyard::config::SwitchyardConfig;
//! use switchyard::control::ControlPlane;
//! use switchyard::task::Task;
//!
//! let plane = ControlPlane::builder(SwitchyardConfig::default())
//!     .executor_for_all(executor)
//!     .build()
//!     .unwrap();
//! let outcome = plane.submit_task(Task::new("review", "diff"), None).await;
//! # }
//! ```

use crate::agent::BackendExecutor;
use crate::config::{ConfigError, SwitchyardConfig};
use crate::cost::CostPredictor;
use crate::health::{HealthEvent, HealthMonitor, HealthStatus};
use crate::mode::{ModeError, ModeInfo, ModeManager, ModeStats, OperationalMode, SwitchOutcome};
use crate::orchestrator::{Dispatcher, ExecutorMap, Orchestrator, OrchestratorError, TaskOutcome};
use crate::queue::BatchQueue;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::registry::{AgentClass, Registry};
use crate::routing::{LoadBalancer, Route, Router, RoutingError, RoutingRecord};
use crate::task::Task;
use crate::telemetry::{TelemetrySink, TracingSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Builder for [`ControlPlane`].
pub struct ControlPlaneBuilder {
    config: SwitchyardConfig,
    executors: ExecutorMap,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ControlPlaneBuilder {
    /// Executor serving every agent of `class`
    pub fn executor(mut self, class: AgentClass, executor: Arc<dyn BackendExecutor>) -> Self {
        self.executors.insert(class, executor);
        self
    }

    /// One executor for every class
    pub fn executor_for_all(mut self, executor: Arc<dyn BackendExecutor>) -> Self {
        for class in AgentClass::ALL {
            self.executors.insert(class, Arc::clone(&executor));
        }
        self
    }

    /// Replace the default `TracingSink`
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Validate the configuration and wire every component.
    pub fn build(self) -> Result<ControlPlane, ConfigError> {
        let config = self.config;
        config.validate()?;
        let mode_configs = config
            .modes
            .resolve()
            .map_err(|message| ConfigError::validation("modes.overrides", message))?;

        for class in AgentClass::ALL {
            if !self.executors.contains_key(&class)
                && config.agents.iter().any(|agent| agent.class == class)
            {
                tracing::warn!(class = %class, "Agents configured for a class with no executor");
            }
        }

        let registry = Arc::new(Registry::new());
        for agent in &config.agents {
            registry.register(agent.to_descriptor());
            tracing::info!(agent_id = %agent.id, class = %agent.class, "Registered agent");
        }

        let health = Arc::new(HealthMonitor::new(
            Arc::clone(&registry),
            config.health.clone(),
            Arc::clone(&self.telemetry),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
        let queue = Arc::new(BatchQueue::new(
            config.queue.clone(),
            Arc::clone(&rate_limiter),
        ));
        let cost = Arc::new(CostPredictor::new(config.cost.clone()));
        let router = Arc::new(Router::new(
            LoadBalancer::new(
                Arc::clone(&registry),
                Arc::clone(&health),
                Arc::clone(&rate_limiter),
            ),
            Arc::clone(&cost),
            config.routing.clone(),
        ));
        let modes = Arc::new(ModeManager::new(
            config.modes.default,
            mode_configs,
            Arc::clone(&self.telemetry),
        ));

        let mut dispatcher = Dispatcher::new(
            self.executors,
            config.orchestrator.timeouts.clone(),
            Arc::clone(&health),
            Arc::clone(&cost),
            Arc::clone(&self.telemetry),
        );
        if config.logging.enable_content_logging {
            dispatcher = dispatcher.with_content_logging(config.logging.content_preview_chars);
        }
        let orchestrator = Orchestrator::new(
            config.orchestrator.clone(),
            Arc::clone(&router),
            Arc::clone(&queue),
            Arc::clone(&modes),
            Arc::new(dispatcher),
            Arc::clone(&self.telemetry),
        );

        tracing::info!(
            agents = registry.len(),
            mode = %modes.current(),
            "Control plane ready"
        );

        Ok(ControlPlane {
            config,
            registry,
            health,
            rate_limiter,
            queue,
            cost,
            router,
            modes,
            orchestrator,
        })
    }
}

/// Routing, resilience and resource governance for agent backends.
pub struct ControlPlane {
    config: SwitchyardConfig,
    registry: Arc<Registry>,
    health: Arc<HealthMonitor>,
    rate_limiter: Arc<RateLimiter>,
    queue: Arc<BatchQueue>,
    cost: Arc<CostPredictor>,
    router: Arc<Router>,
    modes: Arc<ModeManager>,
    orchestrator: Orchestrator,
}

impl ControlPlane {
    pub fn builder(config: SwitchyardConfig) -> ControlPlaneBuilder {
        ControlPlaneBuilder {
            config,
            executors: HashMap::new(),
            telemetry: Arc::new(TracingSink),
        }
    }

    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
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

    pub fn cost(&self) -> &Arc<CostPredictor> {
        &self.cost
    }

    pub fn queue(&self) -> &Arc<BatchQueue> {
        &self.queue
    }

    /// Run a task through routing, fallback and verification.
    ///
    /// `mode` runs this one task under another mode without switching.
    pub async fn submit_task(
        &self,
        task: Task,
        mode: Option<OperationalMode>,
    ) -> Result<TaskOutcome, OrchestratorError> {
        self.orchestrator.submit_task(task, mode).await
    }

    /// Routing decision for `task` without dispatching or recording it.
    pub fn route(&self, task: &Task, mode: Option<OperationalMode>) -> Result<Route, RoutingError> {
        let mode = mode.unwrap_or_else(|| self.modes.current());
        self.router.route(task, mode, &self.modes.config_for(mode))
    }

    /// Health of one backend, or of every tracked backend sorted by id.
    pub fn get_health(&self, backend_id: Option<&str>) -> Vec<HealthStatus> {
        match backend_id {
            Some(id) => self.health.get(id).into_iter().collect(),
            None => {
                let mut statuses: Vec<_> = self.health.all().into_values().collect();
                statuses.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
                statuses
            }
        }
    }

    pub fn get_rate_limit_status(&self, class: AgentClass) -> RateLimitStatus {
        self.rate_limiter.status(class)
    }

    /// Switch the active mode; an invalid name leaves it unchanged.
    pub fn switch_mode(&self, name: &str) -> Result<SwitchOutcome, ModeError> {
        self.modes.switch_mode(name)
    }

    pub fn current_mode(&self) -> OperationalMode {
        self.modes.current()
    }

    pub fn get_available_modes(&self) -> Vec<ModeInfo> {
        self.modes.available_modes()
    }

    pub fn mode_stats(&self) -> HashMap<OperationalMode, ModeStats> {
        self.modes.all_stats()
    }

    /// Recent routing decisions, oldest first.
    pub fn get_routing_history(&self, limit: Option<usize>) -> Vec<RoutingRecord> {
        self.router.history().recent(limit)
    }

    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthEvent> {
        self.health.subscribe()
    }

    pub fn subscribe_modes(&self) -> watch::Receiver<OperationalMode> {
        self.modes.subscribe()
    }

    /// Start health pruning, queue draining and cost retraining.
    ///
    /// Every loop stops when `cancel_token` is cancelled; the queue rejects
    /// whatever is still waiting.
    pub fn start_background(&self, cancel_token: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            Arc::clone(&self.health).start(cancel_token.clone()),
            Arc::clone(&self.queue).start(self.orchestrator.batch_executor(), cancel_token.clone()),
            Arc::clone(&self.cost).start(cancel_token),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    fn config_with_agents() -> SwitchyardConfig {
        let mut config = SwitchyardConfig::default();
        config.agents = vec![
            AgentConfig {
                id: "codex".into(),
                name: None,
                class: AgentClass::Cli,
                capabilities: vec!["code".into()],
                active: true,
            },
            AgentConfig {
                id: "api".into(),
                name: Some("Hosted API".into()),
                class: AgentClass::Hosted,
                capabilities: vec!["code".into()],
                active: true,
            },
        ];
        config
    }

    #[test]
    fn build_registers_configured_agents() {
        let plane = ControlPlane::builder(config_with_agents()).build().unwrap();
        assert_eq!(plane.registry().len(), 2);
        assert_eq!(plane.current_mode(), OperationalMode::FullRedundancy);
        assert!(plane.get_health(None).is_empty());
    }

    #[test]
    fn build_rejects_duplicate_agents() {
        let mut config = config_with_agents();
        config.agents[1].id = "codex".into();
        assert!(matches!(
            ControlPlane::builder(config).build(),
            Err(ConfigError::DuplicateAgent(_))
        ));
    }

    #[test]
    fn dry_run_route_records_nothing() {
        let plane = ControlPlane::builder(config_with_agents()).build().unwrap();
        let route = plane.route(&Task::new("review", "diff"), None).unwrap();
        assert_eq!(route.decision.chosen_agent_id, "codex");
        assert!(plane.get_routing_history(None).is_empty());
    }

    #[test]
    fn invalid_mode_switch_is_rejected() {
        let plane = ControlPlane::builder(config_with_agents()).build().unwrap();
        assert!(plane.switch_mode("warp-speed").is_err());
        assert_eq!(plane.current_mode(), OperationalMode::FullRedundancy);
        assert!(plane.switch_mode("hosted-only").unwrap().changed());
        assert_eq!(*plane.subscribe_modes().borrow(), OperationalMode::HostedOnly);
    }

    #[tokio::test]
    async fn background_loops_stop_on_cancel() {
        let plane = ControlPlane::builder(config_with_agents()).build().unwrap();
        let cancel = CancellationToken::new();
        let handles = plane.start_background(cancel.clone());
        assert_eq!(handles.len(), 3);
        cancel.cancel();
        for result in futures::future::join_all(handles).await {
            assert!(result.is_ok());
        }
    }
}
