//! Shared test utilities for switchyard integration tests.
//!
//! Provides a scripted executor, a recording telemetry sink and config
//! builders so every test drives the control plane through its public API.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchyard::agent::{AgentError, BackendExecutor, ExecutionOutput};
use switchyard::config::{AgentConfig, RateLimitConfig, SwitchyardConfig};
use switchyard::control::ControlPlane;
use switchyard::registry::{AgentClass, AgentDescriptor};
use switchyard::task::Task;
use switchyard::telemetry::{TelemetryEvent, TelemetrySink};

// =============================================================================
// Scripted Executor
// =============================================================================

/// What an agent does on its next call.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(String),
    Throttle,
    /// Sleep past any attempt timeout
    Hang,
}

pub fn reply(text: &str) -> Step {
    Step::Reply(text.to_string())
}

pub fn fail(message: &str) -> Step {
    Step::Fail(message.to_string())
}

/// Executor that plays back per-agent steps and logs every call.
///
/// Once an agent's queue is empty it keeps replying with its default.
#[derive(Default)]
pub struct ScriptedExecutor {
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    defaults: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue steps for `agent_id`, played in order.
    pub fn then(&self, agent_id: &str, steps: impl IntoIterator<Item = Step>) -> &Self {
        self.steps
            .lock()
            .unwrap()
            .entry(agent_id.to_string())
            .or_default()
            .extend(steps);
        self
    }

    /// Behavior once the queued steps run out.
    pub fn always(&self, agent_id: &str, step: Step) -> &Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(agent_id.to_string(), step);
        self
    }

    /// Agent ids in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(agent, _)| agent.clone())
            .collect()
    }

    /// Task ids dispatched to `agent_id`.
    pub fn tasks_for(&self, agent_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(agent, _)| agent == agent_id)
            .map(|(_, task)| task.clone())
            .collect()
    }

    fn next_step(&self, agent_id: &str) -> Step {
        if let Some(step) = self
            .steps
            .lock()
            .unwrap()
            .get_mut(agent_id)
            .and_then(VecDeque::pop_front)
        {
            return step;
        }
        self.defaults
            .lock()
            .unwrap()
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| Step::Reply(format!("{} ok", agent_id)))
    }
}

#[async_trait]
impl BackendExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        task: &Task,
    ) -> Result<ExecutionOutput, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((agent.id.clone(), task.id.clone()));
        match self.next_step(&agent.id) {
            Step::Reply(text) => Ok(ExecutionOutput::text(text)),
            Step::Fail(message) => Err(AgentError::Upstream(message)),
            Step::Throttle => Err(AgentError::Throttled("quota exceeded".to_string())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok(ExecutionOutput::text("too late"))
            }
        }
    }
}

// =============================================================================
// Recording Telemetry
// =============================================================================

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(TelemetryEvent::kind)
            .collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// =============================================================================
// Config Builders
// =============================================================================

pub fn agent_config(id: &str, class: AgentClass, capabilities: &[&str]) -> AgentConfig {
    AgentConfig {
        id: id.to_string(),
        name: None,
        class,
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        active: true,
    }
}

/// Two cli agents, one hosted agent and a supervisor, all able to review.
pub fn standard_agents() -> Vec<AgentConfig> {
    vec![
        agent_config("codex", AgentClass::Cli, &["code", "review"]),
        agent_config("gemini", AgentClass::Cli, &["review"]),
        agent_config("claude-api", AgentClass::Hosted, &["code", "review"]),
        agent_config("supervisor", AgentClass::Supervisory, &["review", "plan"]),
    ]
}

pub fn config_with(agents: Vec<AgentConfig>) -> SwitchyardConfig {
    let mut config = SwitchyardConfig::default();
    config.agents = agents;
    config
}

/// `max_calls` per `window_seconds`, no burst.
pub fn strict_limit(max_calls: u32, window_seconds: u64) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        max_calls,
        window_seconds,
        burst_size: 0,
        burst_refill_per_minute: 0.0,
    }
}

/// Control plane with one scripted executor for every class.
pub fn plane(
    config: SwitchyardConfig,
    executor: &Arc<ScriptedExecutor>,
    telemetry: &Arc<RecordingSink>,
) -> ControlPlane {
    ControlPlane::builder(config)
        .executor_for_all(executor.clone())
        .telemetry(telemetry.clone())
        .build()
        .unwrap()
}
