//! Orchestrator error types.

use crate::queue::QueueError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a candidate did not produce the accepted result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Skipped without dispatch; the class had no rate-limit slot
    RateLimited,
    Timeout { after_ms: u64 },
    Error { message: String },
    /// The task deadline passed before this hop
    DeadlineExceeded,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::RateLimited => f.write_str("rate-limited"),
            FailureReason::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FailureReason::Error { message } => f.write_str(message),
            FailureReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// One failed or skipped candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFailure {
    pub agent_id: String,
    pub reason: FailureReason,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.agent_id, self.reason)
    }
}

/// What ended the fallback chain without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionCause {
    /// No registered agent can serve the task in this mode
    NoCandidates,
    /// Every candidate was tried or skipped
    AllCandidatesFailed,
    DeadlineExceeded,
}

impl fmt::Display for ExhaustionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExhaustionCause::NoCandidates => "no candidate agents",
            ExhaustionCause::AllCandidatesFailed => "all candidates failed",
            ExhaustionCause::DeadlineExceeded => "deadline exceeded",
        })
    }
}

fn describe(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return "no attempts".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal outcomes of `submit_task`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    /// The task could not be completed; lists every attempt in order
    #[error("Task {task_id} exhausted ({cause}): {}", describe(.failures))]
    Exhausted {
        task_id: String,
        cause: ExhaustionCause,
        failures: Vec<CandidateFailure>,
    },

    /// Every candidate was rate limited and the queue could not take or
    /// finish the task
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(#[from] QueueError),
}

impl OrchestratorError {
    /// Failures listed by an `Exhausted` error
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            OrchestratorError::Exhausted { failures, .. } => failures,
            OrchestratorError::CapacityExceeded(_) => &[],
        }
    }
}
