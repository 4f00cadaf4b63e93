//! Static agent definitions

use crate::registry::{AgentClass, AgentDescriptor};
use serde::{Deserialize, Serialize};

/// One agent registered at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub class: AgentClass,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl AgentConfig {
    pub fn to_descriptor(&self) -> AgentDescriptor {
        let descriptor = AgentDescriptor::new(self.id.clone(), self.class)
            .with_name(self.name.clone().unwrap_or_else(|| self.id.clone()))
            .with_capabilities(self.capabilities.iter().cloned());
        if self.active {
            descriptor
        } else {
            descriptor.inactive()
        }
    }
}
