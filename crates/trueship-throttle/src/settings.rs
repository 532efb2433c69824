//! Settings file for the throttler.
//!
//! Typed settings that map to a YAML file, with loading, validation, defaults,
//! and a builder for programmatic use. [`Settings::to_policy`] turns the
//! `throttle` section into a [`ThrottlePolicy`].
//!
//! ```yaml
//! throttle:
//!   profile: linear
//!   max_quota: 5
//!   delay_seconds: 2
//!   max_retry_count: 4
//! logging:
//!   level: debug
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    policy::{ThrottlePolicy, DEFAULT_MAX_QUOTA},
};

// ---------------------------------------------------------------------------
// Settings structs
// ---------------------------------------------------------------------------

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub throttle: ThrottleSettings,
    pub logging: LoggingSettings,
}

/// Named policy presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// TrueShip leaky bucket: size 1, one unit per second, 20 retries.
    /// `max_quota` and `delay_seconds` are ignored.
    #[default]
    Default,
    /// One unit released every `delay_seconds`, sleeping `delay_seconds` when empty
    Linear,
}

/// Throttle section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub profile: Profile,
    /// Bucket capacity (linear profile).
    pub max_quota: u32,
    /// Seconds per released unit, also the wait when empty (linear profile).
    pub delay_seconds: u64,
    /// Overrides the profile's retry ceiling when set.
    pub max_retry_count: Option<u32>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            profile: Profile::Default,
            max_quota: DEFAULT_MAX_QUOTA,
            delay_seconds: 1,
            max_retry_count: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Settings {
    /// Load settings from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Try to load from `path`; fall back to [`Settings::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the settings file.
    ///
    /// Typically `$XDG_CONFIG_HOME/trueship/throttle.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("trueship")
            .join("throttle.yaml")
    }

    /// Validates and builds the throttle policy described by these settings.
    pub fn to_policy(&self) -> Result<ThrottlePolicy, ConfigError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        let throttle = &self.throttle;
        let policy = match throttle.profile {
            Profile::Default => ThrottlePolicy::default(),
            Profile::Linear => {
                ThrottlePolicy::from_delay_seconds(throttle.max_quota, throttle.delay_seconds)?
            }
        };
        Ok(match throttle.max_retry_count {
            Some(max_retry_count) => policy.with_max_retry_count(max_retry_count),
            None => policy,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"throttle.max_quota"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Settings {
    /// Validate the settings and return all errors found.
    ///
    /// An empty vector means the settings are valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- throttle ---
        if self.throttle.profile == Profile::Linear {
            if self.throttle.max_quota == 0 {
                errors.push(ValidationError {
                    field: "throttle.max_quota".into(),
                    message: "must be greater than 0".into(),
                });
            }
            if self.throttle.delay_seconds == 0 {
                errors.push(ValidationError {
                    field: "throttle.delay_seconds".into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// SettingsBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing [`Settings`] programmatically.
///
/// Starts from [`Settings::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use trueship_throttle::settings::{Profile, SettingsBuilder};
///
/// let settings = SettingsBuilder::new()
///     .profile(Profile::Linear)
///     .max_quota(5)
///     .delay_seconds(2)
///     .build();
/// assert!(settings.validate().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Create a new builder initialised with [`Settings::default`] values.
    pub fn new() -> Self {
        Self::default()
    }

    // --- throttle ---

    pub fn profile(mut self, profile: Profile) -> Self {
        self.settings.throttle.profile = profile;
        self
    }

    pub fn max_quota(mut self, max_quota: u32) -> Self {
        self.settings.throttle.max_quota = max_quota;
        self
    }

    pub fn delay_seconds(mut self, seconds: u64) -> Self {
        self.settings.throttle.delay_seconds = seconds;
        self
    }

    pub fn max_retry_count(mut self, n: u32) -> Self {
        self.settings.throttle.max_retry_count = Some(n);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.settings.logging.level = level.into();
        self
    }

    /// Consume the builder and return the settings without validation.
    pub fn build(self) -> Settings {
        self.settings
    }

    /// Consume the builder, validate, and return the settings or all errors.
    pub fn build_validated(self) -> Result<Settings, Vec<ValidationError>> {
        let errors = self.settings.validate();
        if errors.is_empty() {
            Ok(self.settings)
        } else {
            Err(errors)
        }
    }
}
