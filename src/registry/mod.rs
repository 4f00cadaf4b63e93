//! Agent Registry module.
//!
//! Provides thread-safe in-memory storage of live agent descriptors.

mod agent;
mod error;
#[cfg(test)]
mod tests;

pub use agent::*;
pub use error::*;

use dashmap::DashMap;

/// The Agent Registry stores every known agent backend.
///
/// Uses a concurrent map (DashMap) so reads from many in-flight tasks never
/// contend with the occasional registration or performance update.
///
/// # Examples
///
/// ```
/// use switchyard::registry::{AgentClass, AgentDescriptor, Registry};
///
/// let registry = Registry::new();
/// registry.register(AgentDescriptor::new("gpt-hosted", AgentClass::Hosted));
/// assert_eq!(registry.len(), 1);
/// ```
pub struct Registry {
    agents: DashMap<String, AgentDescriptor>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    /// Add an agent, overwriting any previous descriptor with the same id.
    ///
    /// Returns the replaced descriptor, if any.
    pub fn register(&self, descriptor: AgentDescriptor) -> Option<AgentDescriptor> {
        let id = descriptor.id.clone();
        let previous = self.agents.insert(id.clone(), descriptor);
        tracing::debug!(
            agent_id = %id,
            replaced = previous.is_some(),
            "Agent registered"
        );
        previous
    }

    /// Remove an agent from the registry.
    pub fn deregister(&self, id: &str) -> Result<AgentDescriptor, RegistryError> {
        self.agents
            .remove(id)
            .map(|(_, agent)| agent)
            .ok_or_else(|| RegistryError::AgentNotFound(id.to_string()))
    }

    /// Get a snapshot of an agent by ID.
    pub fn get(&self, id: &str) -> Option<AgentDescriptor> {
        self.agents.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of all agents, sorted by id for stable iteration.
    pub fn all(&self) -> Vec<AgentDescriptor> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Snapshot of all agents of one class, sorted by id.
    pub fn by_class(&self, class: AgentClass) -> Vec<AgentDescriptor> {
        let mut agents: Vec<_> = self
            .agents
            .iter()
            .filter(|entry| entry.value().class == class)
            .map(|entry| entry.value().clone())
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Mark an agent active or inactive.
    pub fn set_active(&self, id: &str, active: bool) -> Result<(), RegistryError> {
        let mut agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.to_string()))?;

        if agent.active != active {
            tracing::info!(agent_id = %id, active, "Agent availability changed");
        }
        agent.active = active;
        Ok(())
    }

    /// Replace the performance snapshot of an agent.
    ///
    /// Called by the health monitor after every recompute.
    pub fn update_performance(
        &self,
        id: &str,
        performance: AgentPerformance,
    ) -> Result<(), RegistryError> {
        let mut agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.to_string()))?;

        agent.performance = performance;
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
