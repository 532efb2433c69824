//! Config command - View and manage the throttle settings file
//!
//! Provides the `trueship config` CLI command which:
//! 1. Shows the current settings (YAML or JSON)
//! 2. Sets individual values via dot-notation keys
//! 3. Validates the settings file and reports errors
//! 4. Prints the settings file location

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;
use trueship_throttle::{Profile, Settings};

use crate::output::Output;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current settings
    Show,
    /// Set a settings value
    Set {
        /// Settings key (e.g., "throttle.max_quota")
        key: String,
        /// New value
        value: String,
    },
    /// Validate the settings file
    Validate,
    /// Print the settings file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, path: &Path, output: Output) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(path, output),
            ConfigCommand::Set { key, value } => execute_set(path, key, value, output),
            ConfigCommand::Validate => execute_validate(path, output),
            ConfigCommand::Path => execute_path(path, output),
        }
    }
}

fn execute_show(path: &Path, output: Output) -> Result<()> {
    let settings = Settings::load_or_default(path);

    info!(config_path = %path.display(), "Showing settings");

    if output.is_json() {
        let json =
            serde_json::to_value(&settings).context("Failed to serialize settings to JSON")?;
        output.json(&json);
    } else {
        output.success(&format!("Settings ({})", path.display()));
        output.info("");

        let yaml =
            serde_yaml::to_string(&settings).context("Failed to serialize settings to YAML")?;
        for line in yaml.lines() {
            output.info(line);
        }
    }

    Ok(())
}

fn execute_set(path: &Path, key: &str, value: &str, output: Output) -> Result<()> {
    // An unreadable file is left alone rather than replaced by defaults
    let mut settings = if path.exists() {
        Settings::load(path).with_context(|| {
            format!(
                "Failed to parse settings file {}; fix or remove it first",
                path.display()
            )
        })?
    } else {
        Settings::default()
    };

    info!(key = %key, value = %value, "Setting value");

    if let Err(e) = apply_setting_value(&mut settings, key, value) {
        if output.is_json() {
            output.json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            output.info("Supported keys:");
            output.info("  throttle.profile          - default|linear");
            output.info("  throttle.max_quota        - Bucket capacity (linear)");
            output.info("  throttle.delay_seconds    - Seconds per released unit (linear)");
            output.info("  throttle.max_retry_count  - Retry ceiling, or 'none' for the profile's");
            output.info("  logging.level             - trace|debug|info|warn|error");
        }
        return Err(e.context(format!("Failed to set '{}'", key)));
    }

    let errors = settings.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        if output.is_json() {
            output.json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": messages,
            }));
        }
        bail!("Invalid value for '{}': {}", key, messages.join("; "));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
    }
    let yaml = serde_yaml::to_string(&settings).context("Failed to serialize settings")?;
    std::fs::write(path, yaml).context("Failed to write settings file")?;

    if output.is_json() {
        output.json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": path.display().to_string(),
        }));
    } else {
        output.success(&format!("Set {} = {}", key, value));
        output.info(&format!("Saved to {}", path.display()));
    }

    Ok(())
}

fn execute_validate(path: &Path, output: Output) -> Result<()> {
    if !path.exists() {
        if output.is_json() {
            output.json(&serde_json::json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "errors": [],
                "note": "Settings file not found. Using defaults.",
            }));
        } else {
            output.info(&format!("Settings file not found at {}", path.display()));
            output.info(
                "Using default settings. Run 'trueship config set <key> <value>' to create one.",
            );
        }
        return Ok(());
    }

    // Load explicitly so parse errors are reported instead of hidden by defaults
    let settings = match Settings::load(path) {
        Ok(settings) => settings,
        Err(e) => {
            if output.is_json() {
                output.json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": [format!("Failed to parse settings: {}", e)],
                }));
            } else {
                output.error(&format!("Failed to parse settings: {}", e));
                output.info(&format!("File: {}", path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %path.display(), "Validating settings");

    let errors = settings.validate();

    if output.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        output.json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        output.success("Settings are valid");
        output.info(&format!("File: {}", path.display()));
    } else {
        output.error(&format!(
            "Settings have {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        output.info(&format!("File: {}", path.display()));
        output.info("");
        for error in &errors {
            output.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

fn execute_path(path: &Path, output: Output) -> Result<()> {
    if output.is_json() {
        output.json(&serde_json::json!({
            "config_path": path.display().to_string(),
            "exists": path.exists(),
        }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

/// Apply a dot-notation key/value pair to the settings.
///
/// Values are only parsed here; range checks happen in [`Settings::validate`].
fn apply_setting_value(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "throttle.profile" => {
            settings.throttle.profile = match value {
                "default" => Profile::Default,
                "linear" => Profile::Linear,
                other => bail!("Unknown profile '{}'; expected default or linear", other),
            };
        }
        "throttle.max_quota" => {
            settings.throttle.max_quota = value
                .parse::<u32>()
                .context("Expected a positive integer for throttle.max_quota")?;
        }
        "throttle.delay_seconds" => {
            settings.throttle.delay_seconds = value
                .parse::<u64>()
                .context("Expected a positive integer for throttle.delay_seconds")?;
        }
        "throttle.max_retry_count" => {
            settings.throttle.max_retry_count = match value {
                "none" | "" => None,
                n => Some(
                    n.parse::<u32>()
                        .context("Expected a non-negative integer or 'none'")?,
                ),
            };
        }
        "logging.level" => {
            settings.logging.level = value.to_string();
        }
        _ => bail!("Unknown settings key: {}", key),
    }
    Ok(())
}
