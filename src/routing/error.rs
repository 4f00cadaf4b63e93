//! Error types for routing failures

use crate::mode::OperationalMode;
use thiserror::Error;

/// Errors that can occur during agent selection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// No active agent of an allowed class has the required capabilities
    #[error("No agent in mode '{mode}' can serve task '{task_id}' (required: {required:?})")]
    NoCandidates {
        task_id: String,
        mode: OperationalMode,
        required: Vec<String>,
    },
}
