//! Route command implementation

use crate::cli::output::{format_route_json, format_route_table};
use crate::cli::RouteArgs;
use crate::config::SwitchyardConfig;
use crate::control::ControlPlane;
use crate::mode::OperationalMode;
use crate::task::Task;

fn build_task(args: &RouteArgs) -> Task {
    let mut task = Task::new(args.kind.clone(), args.content.clone())
        .with_capabilities(args.capabilities.iter().cloned());
    if let Some(size) = args.payload_size {
        task = task.with_payload_size(size);
    }
    if let Some(complexity) = args.complexity {
        task = task.with_complexity(complexity);
    }
    task
}

/// Handle `switchyard route`: route against a fresh control plane built
/// from `config`, without executors and without dispatching.
pub fn handle_route(args: &RouteArgs, config: SwitchyardConfig) -> anyhow::Result<String> {
    let mode: Option<OperationalMode> = args.mode.as_deref().map(str::parse).transpose()?;
    let plane = ControlPlane::builder(config).build()?;
    let mode = mode.unwrap_or_else(|| plane.current_mode());

    let route = plane.route(&build_task(args), Some(mode))?;

    if args.json {
        Ok(format_route_json(&route, mode)?)
    } else {
        Ok(format_route_table(&route, mode))
    }
}
