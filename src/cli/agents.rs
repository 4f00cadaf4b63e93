//! Agents command implementation

use crate::cli::output::{format_agents_json, format_agents_table, AgentView};
use crate::cli::AgentsArgs;
use crate::config::SwitchyardConfig;
use crate::registry::AgentClass;

/// Handle `switchyard agents`
pub fn handle_agents(args: &AgentsArgs, config: &SwitchyardConfig) -> anyhow::Result<String> {
    let class: Option<AgentClass> = args
        .class
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let views: Vec<AgentView> = config
        .agents
        .iter()
        .filter(|agent| class.map_or(true, |c| agent.class == c))
        .map(|agent| AgentView::new(agent, config.rate_limits.for_class(agent.class)))
        .collect();

    if args.json {
        Ok(format_agents_json(&views)?)
    } else {
        Ok(format_agents_table(&views))
    }
}
