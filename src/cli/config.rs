//! Config command handlers

use crate::cli::{ConfigInitArgs, ConfigValidateArgs};
use crate::config::SwitchyardConfig;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../switchyard.example.toml");

/// Handle `switchyard config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> anyhow::Result<String> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    Ok(format!(
        "✓ Configuration file created: {}\n  Edit the [[agents]] entries to match your backends.",
        args.output.display()
    ))
}

/// Handle `switchyard config validate` command
///
/// Unlike the other commands a missing file is an error here.
pub fn handle_config_validate(args: &ConfigValidateArgs) -> anyhow::Result<String> {
    let config = SwitchyardConfig::load(Some(&args.config))?;
    config.validate()?;

    Ok(format!(
        "✓ {} is valid: {} agent(s), default mode {}",
        args.config.display(),
        config.agents.len(),
        config.modes.default
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("switchyard.toml");

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        handle_config_init(&args).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[rate_limits.cli]"));
        assert!(content.contains("[[agents]]"));
    }

    #[test]
    fn init_does_not_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("switchyard.toml");
        std::fs::write(&output_path, "existing").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        assert!(handle_config_init(&args).is_err());
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(content, "existing");
    }

    #[test]
    fn init_force_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("switchyard.toml");
        std::fs::write(&output_path, "old content").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: true,
        };

        handle_config_init(&args).unwrap();
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[modes]"));
    }

    #[test]
    fn generated_file_validates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("switchyard.toml");
        handle_config_init(&ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        })
        .unwrap();

        let message = handle_config_validate(&ConfigValidateArgs {
            config: output_path,
        })
        .unwrap();
        assert!(message.contains("is valid"));
    }

    #[test]
    fn validate_reports_bad_rate_limit() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[rate_limits.hosted]\nwindow_seconds = 0\n").unwrap();

        let err = handle_config_validate(&ConfigValidateArgs {
            config: temp.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("rate_limits.hosted"));
    }

    #[test]
    fn validate_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(handle_config_validate(&ConfigValidateArgs {
            config: dir.path().join("absent.toml"),
        })
        .is_err());
    }
}
