use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend class of an agent.
///
/// The class decides which execution adapter runs the task, which rate-limit
/// window applies and which timeout guards each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentClass {
    /// Interactive command-line agent, quota-bound subscription
    Cli,
    /// Hosted model API, billed per token
    Hosted,
    /// The single authoritative supervisory agent
    Supervisory,
}

impl AgentClass {
    /// All classes in declaration order.
    pub const ALL: [AgentClass; 3] = [AgentClass::Cli, AgentClass::Hosted, AgentClass::Supervisory];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentClass::Cli => "cli",
            AgentClass::Hosted => "hosted",
            AgentClass::Supervisory => "supervisory",
        }
    }
}

impl fmt::Display for AgentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(AgentClass::Cli),
            "hosted" => Ok(AgentClass::Hosted),
            "supervisory" => Ok(AgentClass::Supervisory),
            _ => Err(format!("Unknown agent class: {}", s)),
        }
    }
}

/// Observed performance of an agent.
///
/// Written only by the health monitor; read by the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// Rolling average response time in milliseconds
    pub avg_response_time_ms: f64,
    /// Errors over total recorded outcomes (0.0 - 1.0)
    pub error_rate: f64,
    /// Lifetime successfully completed tasks
    pub tasks_completed: u64,
}

/// A live agent backend known to the registry.
///
/// # Examples
///
/// ```
/// use switchyard::registry::{AgentClass, AgentDescriptor};
///
/// let agent = AgentDescriptor::new("claude-cli", AgentClass::Cli)
///     .with_capabilities(["code", "review"]);
/// assert!(agent.has_capabilities(&["code".to_string()]));
/// assert!(agent.active);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Backend class
    pub class: AgentClass,
    /// Capability tags this agent can serve (e.g. "code", "review")
    pub capabilities: Vec<String>,
    /// Observed performance
    pub performance: AgentPerformance,
    /// Whether the agent accepts new tasks
    pub active: bool,
}

impl AgentDescriptor {
    /// Create an active agent with no capabilities and empty performance.
    pub fn new(id: impl Into<String>, class: AgentClass) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            class,
            capabilities: Vec::new(),
            performance: AgentPerformance::default(),
            active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_performance(mut self, performance: AgentPerformance) -> Self {
        self.performance = performance;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True if every required capability is served by this agent.
    ///
    /// Matching is case-insensitive. An empty requirement list always matches.
    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|req| {
            self.capabilities
                .iter()
                .any(|cap| cap.eq_ignore_ascii_case(req))
        })
    }
}
