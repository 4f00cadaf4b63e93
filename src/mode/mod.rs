//! Operational modes.
//!
//! A mode names which agent classes may serve tasks, which routing strategy
//! picks among them and whether results are cross-verified. The active mode
//! lives in a `watch` channel: every routing decision reads the current value
//! and subscribers observe each switch.

mod stats;

pub use stats::ModeStats;

use crate::registry::AgentClass;
use crate::routing::RoutingStrategy;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Errors from mode management
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModeError {
    #[error("Invalid mode '{name}', expected one of: {}", .valid.join(", "))]
    InvalidMode { name: String, valid: Vec<String> },
}

/// Named operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationalMode {
    /// Only the supervisory agent
    SupervisorOnly,
    /// Every class, with cross-verification
    #[default]
    FullRedundancy,
    /// Only command-line agents
    CliOnly,
    /// Only hosted APIs
    HostedOnly,
}

impl OperationalMode {
    pub const ALL: [OperationalMode; 4] = [
        OperationalMode::SupervisorOnly,
        OperationalMode::FullRedundancy,
        OperationalMode::CliOnly,
        OperationalMode::HostedOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalMode::SupervisorOnly => "supervisor-only",
            OperationalMode::FullRedundancy => "full-redundancy",
            OperationalMode::CliOnly => "cli-only",
            OperationalMode::HostedOnly => "hosted-only",
        }
    }

    /// Built-in configuration of the mode.
    pub fn default_config(&self) -> ModeConfig {
        match self {
            OperationalMode::SupervisorOnly => ModeConfig {
                allowed_classes: vec![AgentClass::Supervisory],
                routing_strategy: RoutingStrategy::PriorityBased,
                cross_verification: false,
            },
            OperationalMode::FullRedundancy => ModeConfig {
                allowed_classes: AgentClass::ALL.to_vec(),
                routing_strategy: RoutingStrategy::CapabilityMatch,
                cross_verification: true,
            },
            OperationalMode::CliOnly => ModeConfig {
                allowed_classes: vec![AgentClass::Cli],
                routing_strategy: RoutingStrategy::RoundRobin,
                cross_verification: false,
            },
            OperationalMode::HostedOnly => ModeConfig {
                allowed_classes: vec![AgentClass::Hosted],
                routing_strategy: RoutingStrategy::CostOptimized,
                cross_verification: false,
            },
        }
    }
}

impl fmt::Display for OperationalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        OperationalMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ModeError::InvalidMode {
                name: s.to_string(),
                valid: OperationalMode::ALL
                    .iter()
                    .map(|mode| mode.as_str().to_string())
                    .collect(),
            })
    }
}

/// What a mode allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub allowed_classes: Vec<AgentClass>,
    pub routing_strategy: RoutingStrategy,
    pub cross_verification: bool,
}

impl ModeConfig {
    pub fn allows(&self, class: AgentClass) -> bool {
        self.allowed_classes.contains(&class)
    }
}

/// Result of a successful `switch_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub previous: OperationalMode,
    pub current: OperationalMode,
}

impl SwitchOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Mode with its effective configuration, as listed by `available_modes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeInfo {
    pub mode: OperationalMode,
    pub active: bool,
    #[serde(flatten)]
    pub config: ModeConfig,
}

/// Owns the active mode and per-mode statistics.
pub struct ModeManager {
    configs: HashMap<OperationalMode, ModeConfig>,
    current: watch::Sender<OperationalMode>,
    stats: DashMap<OperationalMode, ModeStats>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ModeManager {
    /// `configs` must hold every mode; missing entries use the built-in one.
    pub fn new(
        initial: OperationalMode,
        mut configs: HashMap<OperationalMode, ModeConfig>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        for mode in OperationalMode::ALL {
            configs.entry(mode).or_insert_with(|| mode.default_config());
        }
        let (current, _) = watch::channel(initial);
        Self {
            configs,
            current,
            stats: DashMap::new(),
            telemetry,
        }
    }

    /// Manager with the built-in configuration of every mode.
    pub fn with_defaults(initial: OperationalMode, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self::new(initial, HashMap::new(), telemetry)
    }

    pub fn current(&self) -> OperationalMode {
        *self.current.borrow()
    }

    pub fn config_for(&self, mode: OperationalMode) -> ModeConfig {
        self.configs
            .get(&mode)
            .cloned()
            .unwrap_or_else(|| mode.default_config())
    }

    /// Active mode and its configuration, read together.
    pub fn snapshot(&self) -> (OperationalMode, ModeConfig) {
        let mode = self.current();
        (mode, self.config_for(mode))
    }

    /// Watch the active mode; receivers always see the latest value.
    pub fn subscribe(&self) -> watch::Receiver<OperationalMode> {
        self.current.subscribe()
    }

    /// Switch to the named mode. An unknown name changes nothing.
    pub fn switch_mode(&self, name: &str) -> Result<SwitchOutcome, ModeError> {
        let target: OperationalMode = name.parse().map_err(|error| {
            tracing::warn!(requested = %name, "Rejected unknown operational mode");
            error
        })?;
        Ok(self.switch_to(target))
    }

    pub fn switch_to(&self, target: OperationalMode) -> SwitchOutcome {
        let previous = self.current.send_replace(target);
        let outcome = SwitchOutcome {
            previous,
            current: target,
        };
        if outcome.changed() {
            tracing::info!(from = %previous, to = %target, "Operational mode switched");
            self.telemetry.record(TelemetryEvent::ModeSwitched {
                from: previous,
                to: target,
            });
        } else {
            tracing::debug!(mode = %target, "Mode unchanged");
        }
        outcome
    }

    /// Every mode with its configuration, in a stable order.
    pub fn available_modes(&self) -> Vec<ModeInfo> {
        let current = self.current();
        OperationalMode::ALL
            .into_iter()
            .map(|mode| ModeInfo {
                mode,
                active: mode == current,
                config: self.config_for(mode),
            })
            .collect()
    }

    pub fn record_task(&self, mode: OperationalMode, success: bool, latency_ms: u64) {
        self.stats
            .entry(mode)
            .or_default()
            .record(success, latency_ms);
    }

    pub fn stats(&self, mode: OperationalMode) -> ModeStats {
        self.stats
            .get(&mode)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn all_stats(&self) -> HashMap<OperationalMode, ModeStats> {
        self.stats
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}
