//! Modes command implementation

use crate::cli::output::{format_modes_json, format_modes_table};
use crate::cli::ModesArgs;
use crate::config::SwitchyardConfig;
use crate::mode::ModeManager;
use crate::telemetry::NoopSink;
use std::sync::Arc;

/// Handle `switchyard modes`
pub fn handle_modes(args: &ModesArgs, config: &SwitchyardConfig) -> anyhow::Result<String> {
    let resolved = config
        .modes
        .resolve()
        .map_err(|message| anyhow::anyhow!("Invalid mode overrides: {}", message))?;
    let manager = ModeManager::new(config.modes.default, resolved, Arc::new(NoopSink));
    let modes = manager.available_modes();

    if args.json {
        Ok(format_modes_json(&modes)?)
    } else {
        Ok(format_modes_table(&modes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModeOverride;
    use crate::mode::OperationalMode;
    use std::path::PathBuf;

    #[test]
    fn overrides_and_default_are_shown() {
        let mut config = SwitchyardConfig::default();
        config.modes.default = OperationalMode::CliOnly;
        config.modes.overrides.insert(
            "cli-only".to_string(),
            ModeOverride {
                cross_verification: Some(true),
                ..Default::default()
            },
        );
        let args = ModesArgs {
            json: true,
            config: PathBuf::from("unused.toml"),
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&handle_modes(&args, &config).unwrap()).unwrap();
        let cli_only = parsed["modes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["mode"] == "cli-only")
            .unwrap()
            .clone();
        assert_eq!(cli_only["active"], true);
        assert_eq!(cli_only["cross_verification"], true);
    }
}
