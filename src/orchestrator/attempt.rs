//! Per-attempt execution results.

use crate::registry::AgentClass;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// How one dispatch to one agent ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success { output: String },
    Error { message: String },
    /// The attempt timer fired first; any late answer was discarded
    Timeout { after_ms: u64 },
}

impl ExecutionOutcome {
    /// Metric and log label
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success { .. } => "success",
            ExecutionOutcome::Error { .. } => "error",
            ExecutionOutcome::Timeout { .. } => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    /// Backend answer, if the attempt succeeded.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success { output } => Some(output),
            _ => None,
        }
    }
}

/// Result of dispatching a task to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub agent_id: String,
    pub agent_class: AgentClass,
    pub outcome: ExecutionOutcome,
    pub latency_ms: u64,
    /// Completion time; strictly increasing across attempts
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Hands out strictly increasing completion timestamps.
///
/// Wall clocks can repeat or step back; a repeated value is bumped one
/// microsecond past the previous stamp.
#[derive(Debug)]
pub(crate) struct AttemptClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl AttemptClock {
    pub(crate) fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub(crate) fn stamp(&self) -> DateTime<Utc> {
        self.stamp_at(Utc::now())
    }

    fn stamp_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let stamp = match *last {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}
