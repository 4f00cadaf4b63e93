//! Error types for backend execution.

use thiserror::Error;

/// Errors an execution adapter can report for one attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// Backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend reported its own quota or throttling limit.
    #[error("Throttled by backend: {0}")]
    Throttled(String),

    /// Backend accepted the task but failed to complete it.
    #[error("Backend error: {0}")]
    Upstream(String),

    /// Backend answered with something the adapter could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No adapter is configured for the agent's class.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// True if the failure came from backend throttling.
    pub fn is_throttle(&self) -> bool {
        matches!(self, AgentError::Throttled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            AgentError::Throttled("429".into()).to_string(),
            "Throttled by backend: 429"
        );
        assert_eq!(
            AgentError::Upstream("exit 1".into()).to_string(),
            "Backend error: exit 1"
        );
    }

    #[test]
    fn throttle_detection() {
        assert!(AgentError::Throttled("quota".into()).is_throttle());
        assert!(!AgentError::Network("refused".into()).is_throttle());
    }
}
