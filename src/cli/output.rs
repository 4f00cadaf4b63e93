//! Output formatting helpers for CLI commands

use crate::config::{AgentConfig, RateLimitConfig};
use crate::mode::{ModeInfo, OperationalMode};
use crate::registry::AgentClass;
use crate::routing::Route;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;

/// View model for agent display
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub class: AgentClass,
    pub capabilities: Vec<String>,
    pub active: bool,
    /// Class quota, e.g. "135 / 5h + burst 10"
    pub rate_limit: String,
}

impl AgentView {
    pub fn new(agent: &AgentConfig, limit: &RateLimitConfig) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone().unwrap_or_else(|| agent.id.clone()),
            class: agent.class,
            capabilities: agent.capabilities.clone(),
            active: agent.active,
            rate_limit: describe_limit(limit),
        }
    }
}

/// Human-readable quota for one class.
pub fn describe_limit(limit: &RateLimitConfig) -> String {
    if !limit.enabled {
        return "unlimited".to_string();
    }
    let window = if limit.window_seconds % 3600 == 0 {
        format!("{}h", limit.window_seconds / 3600)
    } else if limit.window_seconds % 60 == 0 {
        format!("{}m", limit.window_seconds / 60)
    } else {
        format!("{}s", limit.window_seconds)
    };
    if limit.burst_size > 0 {
        format!("{} / {} + burst {}", limit.max_calls, window, limit.burst_size)
    } else {
        format!("{} / {}", limit.max_calls, window)
    }
}

fn class_cell(class: AgentClass) -> String {
    match class {
        AgentClass::Cli => class.as_str().cyan().to_string(),
        AgentClass::Hosted => class.as_str().blue().to_string(),
        AgentClass::Supervisory => class.as_str().magenta().to_string(),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Format agents as a table
pub fn format_agents_table(agents: &[AgentView]) -> String {
    let mut table = new_table(vec!["ID", "Name", "Class", "Capabilities", "Status", "Quota"]);

    for a in agents {
        let status = if a.active {
            "Active".green().to_string()
        } else {
            "Inactive".yellow().to_string()
        };
        table.add_row(vec![
            Cell::new(&a.id),
            Cell::new(&a.name),
            Cell::new(class_cell(a.class)),
            Cell::new(a.capabilities.join(", ")),
            Cell::new(status),
            Cell::new(&a.rate_limit),
        ]);
    }

    table.to_string()
}

/// Format agents as JSON
pub fn format_agents_json(agents: &[AgentView]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({ "agents": agents }))
}

/// Format modes as a table; the active mode is marked with `*`
pub fn format_modes_table(modes: &[ModeInfo]) -> String {
    let mut table = new_table(vec!["Mode", "Classes", "Strategy", "Verification"]);

    for m in modes {
        let name = if m.active {
            format!("* {}", m.mode).green().bold().to_string()
        } else {
            format!("  {}", m.mode)
        };
        let classes: Vec<_> = m
            .config
            .allowed_classes
            .iter()
            .map(|class| class.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(name),
            Cell::new(classes.join(", ")),
            Cell::new(m.config.routing_strategy),
            Cell::new(if m.config.cross_verification { "on" } else { "off" }),
        ]);
    }

    table.to_string()
}

/// Format modes as JSON
pub fn format_modes_json(modes: &[ModeInfo]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({ "modes": modes }))
}

/// Format a routing decision and its fallback chain
pub fn format_route_table(route: &Route, mode: OperationalMode) -> String {
    let decision = &route.decision;
    let mut out = format!(
        "{} {} ({} mode, {})\n",
        "→".green(),
        decision.chosen_agent_id.bold(),
        mode,
        decision.strategy
    );
    out.push_str(&format!("  reason: {}\n", decision.reason));
    out.push_str(&format!(
        "  predicted cost: ${:.6} (confidence {:.2}, savings ${:.6})\n",
        decision.predicted_cost, decision.confidence, decision.savings
    ));

    let mut table = new_table(vec!["#", "Agent", "Class", "Latency"]);
    for (i, agent) in route.chain.agents().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&agent.id),
            Cell::new(class_cell(agent.class)),
            Cell::new(format!("{:.0}ms", agent.performance.avg_response_time_ms)),
        ]);
    }
    out.push_str(&table.to_string());
    out
}

/// Format a routing decision as JSON
pub fn format_route_json(route: &Route, mode: OperationalMode) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({
        "mode": mode,
        "decision": route.decision,
        "chain": route.chain.ids(),
    }))
}
