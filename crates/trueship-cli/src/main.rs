//! TrueShip CLI - drive requests through the throttler
//!
//! Provides commands for:
//! - Probing an endpoint with throttled GET requests
//! - Viewing and validating the throttle settings file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use trueship_throttle::Settings;

mod commands;
mod output;

use commands::{config::ConfigCommand, probe::ProbeCommand};
use output::{Output, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "trueship", version, about = "Throttled access to the TrueShip API")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate settings file
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send throttled GET requests to an endpoint
    Probe(ProbeCommand),
    /// View and manage throttle settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.config_file.clone().unwrap_or_else(Settings::default_path);
    let loaded = load_settings(&settings_path, cli.config_file.is_some());

    // Setup tracing; -v overrides the level from the settings file
    let filter = match (cli.verbose, &loaded) {
        (0, Ok((settings, _))) => settings.logging.level.as_str(),
        (0, Err(_)) => "info",
        (1, _) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so stdout stays parseable with --json
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let output = Output::new(format);

    match cli.command {
        Commands::Probe(cmd) => {
            let (settings, ignored) = loaded?;
            if let Some(err) = ignored {
                warn!(
                    config_path = %settings_path.display(),
                    error = %format!("{:#}", err),
                    "Ignoring unreadable settings file, using defaults"
                );
            }
            cmd.execute(&settings, output).await
        }
        // Config commands read the file themselves and report its problems
        Commands::Config(cmd) => cmd.execute(&settings_path, output).await,
    }
}

/// Loads the settings the commands run with.
///
/// A path given with `--config` must exist and parse. The default path falls
/// back to defaults when missing; when it exists but cannot be read, the
/// defaults are used and the load error is returned alongside for reporting.
fn load_settings(path: &Path, explicit: bool) -> Result<(Settings, Option<anyhow::Error>)> {
    if explicit {
        let settings = Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        return Ok((settings, None));
    }

    if !path.exists() {
        return Ok((Settings::default(), None));
    }
    match Settings::load(path) {
        Ok(settings) => Ok((settings, None)),
        Err(err) => Ok((Settings::default(), Some(err))),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_explicit_settings_path_must_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");

        let err = load_settings(&missing, true).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_explicit_settings_path_must_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "throttle:\n  max_retry_count: oops\n").unwrap();

        assert!(load_settings(&broken, true).is_err());
    }

    #[test]
    fn test_explicit_settings_path_is_used() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("throttle.yaml");
        std::fs::write(&path, "throttle:\n  profile: linear\n  max_quota: 4\n").unwrap();

        let (settings, ignored) = load_settings(&path, true).unwrap();
        assert!(ignored.is_none());
        assert_eq!(settings.throttle.profile, trueship_throttle::Profile::Linear);
        assert_eq!(settings.throttle.max_quota, 4);
    }

    #[test]
    fn test_default_settings_path_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();

        let (settings, ignored) = load_settings(&dir.path().join("absent.yaml"), false).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(ignored.is_none());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "throttle: [not, a, map").unwrap();
        let (settings, ignored) = load_settings(&broken, false).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(ignored.is_some());
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_probe_with_global_flags() {
        let cli = Cli::try_parse_from([
            "trueship",
            "--json",
            "-vv",
            "probe",
            "http://localhost/orders",
            "--requests",
            "3",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Probe(_)));
    }

    #[test]
    fn parses_config_subcommand_with_custom_path() {
        let cli =
            Cli::try_parse_from(["trueship", "config", "show", "--config", "/tmp/t.yaml"]).unwrap();
        assert_eq!(cli.config_file, Some(PathBuf::from("/tmp/t.yaml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Show)));
    }
}
