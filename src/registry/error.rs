/// Errors that can occur during registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),
}
