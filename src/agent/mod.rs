//! Backend execution interface.
//!
//! The control plane never speaks a backend protocol itself. Each agent class
//! is served by one `BackendExecutor` implementation injected at
//! construction; real adapters and test fakes plug into the same seam.

use async_trait::async_trait;

pub mod error;
pub mod types;

pub use error::AgentError;
pub use types::ExecutionOutput;

use crate::registry::AgentDescriptor;
use crate::task::Task;

/// Executes a task on one concrete agent.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn BackendExecutor>`.
///
/// # Cancellation Safety
///
/// Implementations must be cancellation-safe: the orchestrator drops the
/// future when the attempt timeout fires and never looks at a late result.
#[async_trait]
pub trait BackendExecutor: Send + Sync + 'static {
    /// Run `task` on `agent` and return its normalized output.
    ///
    /// # Returns
    ///
    /// - `Ok(ExecutionOutput)` when the backend completed the task
    /// - `Err(AgentError::Throttled)` if the backend hit its own quota
    /// - `Err(AgentError::Upstream)` / `Network` / `InvalidResponse` otherwise
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        task: &Task,
    ) -> Result<ExecutionOutput, AgentError>;
}
