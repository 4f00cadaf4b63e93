//! Single-agent dispatch shared by the fallback chain and the batch queue.

use super::attempt::{AttemptClock, ExecutionOutcome, ExecutionResult};
use crate::agent::{AgentError, BackendExecutor};
use crate::config::TimeoutConfig;
use crate::cost::{CostPredictor, TaskFeatures};
use crate::health::{ErrorKind, HealthMonitor};
use crate::logging::content_preview;
use crate::queue::{Batch, BatchExecutor};
use crate::registry::{AgentClass, AgentDescriptor};
use crate::routing::Router;
use crate::task::Task;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

enum Failed {
    Timeout,
    Agent(AgentError),
}

/// Executor per agent class
pub type ExecutorMap = HashMap<AgentClass, Arc<dyn BackendExecutor>>;

/// Runs one task on one agent under the class timeout and reports the
/// outcome to health, cost and telemetry.
///
/// Never touches the rate limiter; callers own the slot.
pub struct Dispatcher {
    executors: ExecutorMap,
    timeouts: TimeoutConfig,
    health: Arc<HealthMonitor>,
    cost: Arc<CostPredictor>,
    telemetry: Arc<dyn TelemetrySink>,
    clock: AttemptClock,
    /// Characters of task content to log, when content logging is enabled
    content_preview: Option<usize>,
}

impl Dispatcher {
    pub fn new(
        executors: ExecutorMap,
        timeouts: TimeoutConfig,
        health: Arc<HealthMonitor>,
        cost: Arc<CostPredictor>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            executors,
            timeouts,
            health,
            cost,
            telemetry,
            clock: AttemptClock::new(),
            content_preview: None,
        }
    }

    /// Log up to `chars` characters of task content with each dispatch.
    pub fn with_content_logging(mut self, chars: usize) -> Self {
        self.content_preview = Some(chars);
        self
    }

    pub fn has_executor(&self, class: AgentClass) -> bool {
        self.executors.contains_key(&class)
    }

    pub async fn dispatch(&self, agent: &AgentDescriptor, task: &Task) -> ExecutionResult {
        let timeout = self.timeouts.for_class(agent.class);
        match self.content_preview {
            Some(chars) => tracing::debug!(
                task_id = %task.id,
                agent_id = %agent.id,
                timeout_ms = timeout.as_millis() as u64,
                content = %content_preview(&task.content, chars),
                "Dispatching task"
            ),
            None => tracing::debug!(
                task_id = %task.id,
                agent_id = %agent.id,
                timeout_ms = timeout.as_millis() as u64,
                "Dispatching task"
            ),
        }

        let start = Instant::now();
        let attempt = match self.executors.get(&agent.class) {
            None => Err(Failed::Agent(AgentError::Configuration(format!(
                "no executor for class {}",
                agent.class
            )))),
            // The losing future is dropped; a late answer is never observed
            Some(executor) => {
                match tokio::time::timeout(timeout, executor.execute(agent, task)).await {
                    Ok(result) => result.map_err(Failed::Agent),
                    Err(_) => Err(Failed::Timeout),
                }
            }
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        let outcome = match attempt {
            Ok(output) => {
                self.health
                    .record_response_time(&agent.id, latency_ms as f64);
                let features = TaskFeatures::from_task(task);
                let record = self.cost.record_outcome(&agent.id, &features, &output);
                self.telemetry.record(TelemetryEvent::CostRecorded(record));
                ExecutionOutcome::Success {
                    output: output.output,
                }
            }
            Err(Failed::Timeout) => {
                let after_ms = timeout.as_millis() as u64;
                tracing::warn!(
                    task_id = %task.id,
                    agent_id = %agent.id,
                    after_ms,
                    "Attempt timed out"
                );
                self.health.record_error(&agent.id, ErrorKind::Timeout);
                ExecutionOutcome::Timeout { after_ms }
            }
            Err(Failed::Agent(error)) => {
                tracing::warn!(
                    task_id = %task.id,
                    agent_id = %agent.id,
                    error = %error,
                    "Attempt failed"
                );
                let kind = if error.is_throttle() {
                    ErrorKind::Throttled
                } else {
                    ErrorKind::Failure
                };
                self.health.record_error(&agent.id, kind);
                ExecutionOutcome::Error {
                    message: error.to_string(),
                }
            }
        };

        self.finish(agent, task, latency_ms, outcome)
    }

    fn finish(
        &self,
        agent: &AgentDescriptor,
        task: &Task,
        latency_ms: u64,
        outcome: ExecutionOutcome,
    ) -> ExecutionResult {
        let result = ExecutionResult {
            agent_id: agent.id.clone(),
            agent_class: agent.class,
            outcome,
            latency_ms,
            timestamp: self.clock.stamp(),
        };
        self.telemetry.record(TelemetryEvent::Attempt {
            task_id: task.id.clone(),
            result: result.clone(),
        });
        result
    }
}

/// Serves queued batches: one dispatch per batch on the best agent of the
/// lane's class.
pub(crate) struct QueueDispatch {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) router: Arc<Router>,
}

impl QueueDispatch {
    /// Healthy capable agents first, fastest first.
    fn pick(&self, class: AgentClass, task: &Task) -> Option<AgentDescriptor> {
        let health = self.router.balancer().health();
        let mut agents: Vec<_> = self
            .router
            .balancer()
            .registry()
            .by_class(class)
            .into_iter()
            .filter(|agent| agent.active && agent.has_capabilities(&task.required_capabilities))
            .collect();
        agents.sort_by(|a, b| {
            health
                .is_degraded(&a.id)
                .cmp(&health.is_degraded(&b.id))
                .then_with(|| {
                    a.performance
                        .avg_response_time_ms
                        .total_cmp(&b.performance.avg_response_time_ms)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        agents.into_iter().next()
    }
}

#[async_trait]
impl BatchExecutor for QueueDispatch {
    async fn execute_batch(
        &self,
        class: AgentClass,
        batch: &Batch,
    ) -> Result<ExecutionResult, String> {
        let task = batch
            .representative()
            .ok_or_else(|| "empty batch".to_string())?;
        let agent = self
            .pick(class, task)
            .ok_or_else(|| format!("no active {} agent for batch", class))?;

        let result = self.dispatcher.dispatch(&agent, task).await;
        match &result.outcome {
            ExecutionOutcome::Success { .. } => Ok(result),
            ExecutionOutcome::Error { message } => Err(format!("{}: {}", agent.id, message)),
            ExecutionOutcome::Timeout { after_ms } => {
                Err(format!("{}: timed out after {}ms", agent.id, after_ms))
            }
        }
    }
}
