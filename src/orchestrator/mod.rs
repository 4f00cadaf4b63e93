//! Fallback and cross-verification orchestration
//!
//! Drives one task through its fallback chain. Each hop checks the deadline,
//! takes a rate-limit slot for the agent's class and dispatches under the
//! class timeout; a timeout or error advances to the next agent. When every
//! candidate was refused by the rate limiter the task is handed to the batch
//! queue instead. In modes that ask for it, an accepted result is checked
//! against one more backend of a different class.

mod attempt;
mod dispatch;
mod error;
mod verification;


pub use attempt::{ExecutionOutcome, ExecutionResult};
pub use dispatch::{Dispatcher, ExecutorMap};
pub use error::{CandidateFailure, ExhaustionCause, FailureReason, OrchestratorError};
pub use verification::{normalize, similarity, VerificationResult};

use crate::config::OrchestratorConfig;
use crate::mode::{ModeConfig, ModeManager, OperationalMode};
use crate::queue::{BatchExecutor, BatchQueue, QueueError};
use crate::rate_limit::RateLimiter;
use crate::registry::{AgentClass, AgentDescriptor};
use crate::routing::{FallbackChain, Router, RoutingDecision};
use crate::task::Task;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use dispatch::QueueDispatch;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;

/// Successful result of `submit_task`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub mode: OperationalMode,
    /// Accepted result, returned unchanged whatever verification found
    pub result: ExecutionResult,
    /// Dispatched attempts in order, the accepted one last
    pub attempts: Vec<ExecutionResult>,
    /// Candidates that failed or were skipped before the accepted one
    pub failures: Vec<CandidateFailure>,
    pub decision: RoutingDecision,
    pub verification: Option<VerificationResult>,
    /// Result came from the batch queue
    pub queued: bool,
    pub latency_ms: u64,
}

struct ChainRun {
    attempts: Vec<ExecutionResult>,
    failures: Vec<CandidateFailure>,
    accepted: Option<ExecutionResult>,
    deadline_hit: bool,
}

impl ChainRun {
    fn all_rate_limited(&self) -> bool {
        self.attempts.is_empty()
            && !self.deadline_hit
            && !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|failure| failure.reason == FailureReason::RateLimited)
    }
}

/// Runs tasks through routing, fallback and verification.
pub struct Orchestrator {
    config: OrchestratorConfig,
    router: Arc<Router>,
    rate_limiter: Arc<RateLimiter>,
    queue: Arc<BatchQueue>,
    modes: Arc<ModeManager>,
    dispatcher: Arc<Dispatcher>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        router: Arc<Router>,
        queue: Arc<BatchQueue>,
        modes: Arc<ModeManager>,
        dispatcher: Arc<Dispatcher>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let rate_limiter = Arc::clone(router.balancer().rate_limiter());
        Self {
            config,
            router,
            rate_limiter,
            queue,
            modes,
            dispatcher,
            telemetry,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Batch executor serving the queue with this orchestrator's dispatcher.
    pub fn batch_executor(&self) -> Arc<dyn BatchExecutor> {
        Arc::new(QueueDispatch {
            dispatcher: Arc::clone(&self.dispatcher),
            router: Arc::clone(&self.router),
        })
    }

    /// Run `task` to completion under `mode`, or the active mode.
    ///
    /// The mode is read once; a switch during the task applies to the next
    /// one. `Exhausted` is the only failure once the task has been routed,
    /// apart from `CapacityExceeded` when the queue cannot take it.
    pub async fn submit_task(
        &self,
        task: Task,
        mode: Option<OperationalMode>,
    ) -> Result<TaskOutcome, OrchestratorError> {
        let start = Instant::now();
        let (mode, mode_config) = match mode {
            Some(mode) => (mode, self.modes.config_for(mode)),
            None => self.modes.snapshot(),
        };

        let result = self.run(&task, mode, &mode_config, start).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        let (success, attempts) = match &result {
            Ok(outcome) => (true, outcome.attempts.len()),
            Err(error) => (false, error.failures().len()),
        };

        self.modes.record_task(mode, success, latency_ms);
        self.telemetry.record(TelemetryEvent::TaskCompleted {
            task_id: task.id.clone(),
            mode,
            success,
            attempts,
            latency_ms,
        });
        result
    }

    async fn run(
        &self,
        task: &Task,
        mode: OperationalMode,
        mode_config: &ModeConfig,
        start: Instant,
    ) -> Result<TaskOutcome, OrchestratorError> {
        if task.is_expired() {
            tracing::warn!(task_id = %task.id, "Task deadline passed before dispatch");
            return Err(OrchestratorError::Exhausted {
                task_id: task.id.clone(),
                cause: ExhaustionCause::DeadlineExceeded,
                failures: Vec::new(),
            });
        }

        let route = self
            .router
            .route(task, mode, mode_config)
            .map_err(|_| OrchestratorError::Exhausted {
                task_id: task.id.clone(),
                cause: ExhaustionCause::NoCandidates,
                failures: Vec::new(),
            })?;
        self.router.record(&route.decision, mode);
        self.telemetry.record(TelemetryEvent::RoutingDecision {
            task_id: task.id.clone(),
            mode,
            decision: route.decision.clone(),
        });

        let run = self.run_chain(task, &route.chain).await;

        if let Some(accepted) = run.accepted.clone() {
            let verification = if mode_config.cross_verification && self.config.verification.enabled
            {
                self.verify(task, &route.chain, &run.attempts, &accepted)
                    .await
            } else {
                None
            };
            return Ok(TaskOutcome {
                task_id: task.id.clone(),
                mode,
                result: accepted,
                attempts: run.attempts,
                failures: run.failures,
                decision: route.decision,
                verification,
                queued: false,
                latency_ms: start.elapsed().as_millis() as u64,
            });
        }

        if run.all_rate_limited() && self.queue.config().is_enabled() {
            if let Some(primary) = route.chain.primary() {
                let result = self.await_queue(task, primary.class).await;
                return match result {
                    Ok(result) => Ok(TaskOutcome {
                        task_id: task.id.clone(),
                        mode,
                        result: result.clone(),
                        attempts: vec![result],
                        failures: run.failures,
                        decision: route.decision,
                        verification: None,
                        queued: true,
                        latency_ms: start.elapsed().as_millis() as u64,
                    }),
                    Err(QueueError::RetriesExhausted {
                        attempts,
                        last_error,
                    }) => {
                        let mut failures = run.failures;
                        failures.push(CandidateFailure {
                            agent_id: primary.id.clone(),
                            reason: FailureReason::Error {
                                message: format!(
                                    "queued batch failed after {} attempts: {}",
                                    attempts, last_error
                                ),
                            },
                        });
                        Err(OrchestratorError::Exhausted {
                            task_id: task.id.clone(),
                            cause: ExhaustionCause::AllCandidatesFailed,
                            failures,
                        })
                    }
                    Err(QueueError::DeadlineExceeded) => {
                        tracing::warn!(task_id = %task.id, "Deadline passed while queued");
                        Err(OrchestratorError::Exhausted {
                            task_id: task.id.clone(),
                            cause: ExhaustionCause::DeadlineExceeded,
                            failures: run.failures,
                        })
                    }
                    Err(error) => Err(OrchestratorError::CapacityExceeded(error)),
                };
            }
        }

        let cause = if run.deadline_hit {
            ExhaustionCause::DeadlineExceeded
        } else {
            ExhaustionCause::AllCandidatesFailed
        };
        tracing::error!(
            task_id = %task.id,
            mode = %mode,
            cause = %cause,
            failures = run.failures.len(),
            "Fallback chain exhausted"
        );
        Err(OrchestratorError::Exhausted {
            task_id: task.id.clone(),
            cause,
            failures: run.failures,
        })
    }

    /// Walk the chain until one agent succeeds. Each agent is dispatched at
    /// most once.
    async fn run_chain(&self, task: &Task, chain: &FallbackChain) -> ChainRun {
        let mut run = ChainRun {
            attempts: Vec::new(),
            failures: Vec::new(),
            accepted: None,
            deadline_hit: false,
        };

        for (hop, agent) in chain.agents().iter().enumerate() {
            if task.is_expired() {
                tracing::warn!(task_id = %task.id, agent_id = %agent.id, "Deadline passed mid-chain");
                run.deadline_hit = true;
                run.failures.push(CandidateFailure {
                    agent_id: agent.id.clone(),
                    reason: FailureReason::DeadlineExceeded,
                });
                break;
            }

            if let Err(error) = self.rate_limiter.try_acquire(agent.class) {
                tracing::debug!(
                    task_id = %task.id,
                    agent_id = %agent.id,
                    error = %error,
                    "Skipping rate-limited agent"
                );
                run.failures.push(CandidateFailure {
                    agent_id: agent.id.clone(),
                    reason: FailureReason::RateLimited,
                });
                continue;
            }

            tracing::info!(task_id = %task.id, agent_id = %agent.id, hop, "Dispatching to agent");
            let result = self.dispatcher.dispatch(agent, task).await;
            run.attempts.push(result.clone());

            match &result.outcome {
                ExecutionOutcome::Success { .. } => {
                    if hop > 0 {
                        metrics::counter!("switchyard_fallbacks_total",
                            "agent" => agent.id.clone()
                        )
                        .increment(1);
                    }
                    run.accepted = Some(result);
                    break;
                }
                ExecutionOutcome::Timeout { after_ms } => {
                    run.failures.push(CandidateFailure {
                        agent_id: agent.id.clone(),
                        reason: FailureReason::Timeout {
                            after_ms: *after_ms,
                        },
                    });
                }
                ExecutionOutcome::Error { message } => {
                    run.failures.push(CandidateFailure {
                        agent_id: agent.id.clone(),
                        reason: FailureReason::Error {
                            message: message.clone(),
                        },
                    });
                }
            }
        }

        run
    }

    async fn await_queue(&self, task: &Task, class: AgentClass) -> Result<ExecutionResult, QueueError> {
        tracing::info!(task_id = %task.id, class = %class, "All candidates rate limited, queueing task");
        let rx = self.queue.enqueue(class, task.clone()).await?;
        let max_wait = self.queue.config().max_wait();
        // The deadline bounds the wait when it comes first
        let (wait, on_timeout) = match task.time_remaining() {
            Some(left) if left < max_wait => (left, QueueError::DeadlineExceeded),
            _ => (max_wait, QueueError::WaitExceeded { max_wait }),
        };
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => Err(QueueError::Shutdown),
            Err(_) => Err(on_timeout),
        }
    }

    /// Whether the run qualifies for verification.
    fn mixed(&self, chain: &FallbackChain, attempts: &[ExecutionResult]) -> bool {
        let classes: Vec<AgentClass> = if self.config.verification.require_mixed_attempts {
            attempts.iter().map(|attempt| attempt.agent_class).collect()
        } else {
            chain.agents().iter().map(|agent| agent.class).collect()
        };
        classes.contains(&AgentClass::Cli) && classes.contains(&AgentClass::Hosted)
    }

    /// Next agent of a different class than the accepted one: unused chain
    /// members first, then other capable agents.
    fn verifier(
        &self,
        task: &Task,
        chain: &FallbackChain,
        attempts: &[ExecutionResult],
        accepted: &ExecutionResult,
    ) -> Option<AgentDescriptor> {
        let tried = |agent: &AgentDescriptor| attempts.iter().any(|a| a.agent_id == agent.id);
        let eligible = |agent: &AgentDescriptor| {
            agent.class != accepted.agent_class
                && !tried(agent)
                && self.dispatcher.has_executor(agent.class)
                && self.router.balancer().is_available(agent)
        };

        if let Some(agent) = chain.agents().iter().find(|agent| eligible(agent)) {
            return Some(agent.clone());
        }
        let mut others: Vec<_> = self
            .router
            .balancer()
            .registry()
            .all()
            .into_iter()
            .filter(|agent| {
                agent.active && agent.has_capabilities(&task.required_capabilities)
            })
            .filter(|agent| !chain.contains(&agent.id) && eligible(agent))
            .collect();
        others.sort_by(|a, b| {
            a.performance
                .avg_response_time_ms
                .total_cmp(&b.performance.avg_response_time_ms)
        });
        others.into_iter().next()
    }

    /// Re-issue the task to one more backend and compare. Never changes the
    /// accepted result.
    async fn verify(
        &self,
        task: &Task,
        chain: &FallbackChain,
        attempts: &[ExecutionResult],
        accepted: &ExecutionResult,
    ) -> Option<VerificationResult> {
        if !self.mixed(chain, attempts) {
            return None;
        }
        let accepted_output = accepted.outcome.output()?;
        let Some(verifier) = self.verifier(task, chain, attempts, accepted) else {
            tracing::debug!(task_id = %task.id, "No verifier available");
            return None;
        };
        if self.rate_limiter.try_acquire(verifier.class).is_err() {
            tracing::debug!(task_id = %task.id, verifier_id = %verifier.id, "Verifier rate limited");
            return None;
        }

        let check = self.dispatcher.dispatch(&verifier, task).await;
        let Some(verifier_output) = check.outcome.output() else {
            tracing::warn!(
                task_id = %task.id,
                verifier_id = %verifier.id,
                outcome = check.outcome.label(),
                "Verification call failed"
            );
            return None;
        };

        let result = verification::compare(
            &task.id,
            &accepted.agent_id,
            accepted_output,
            &verifier.id,
            verifier_output,
        );
        if result.agreement {
            tracing::debug!(task_id = %task.id, verifier_id = %verifier.id, "Verification agreed");
        } else {
            self.telemetry
                .record(TelemetryEvent::VerificationDiscrepancy(result.clone()));
        }
        Some(result)
    }
}
