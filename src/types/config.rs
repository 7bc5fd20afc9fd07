//! Configuration types for tether.
//!
//! The orchestrator is configured from an optional TOML file. Every field has
//! a default, so an empty (or missing) file yields a working configuration.
//!
//! Durations are written as humantime strings:
//!
//! ```toml
//! status_tick = "100ms"
//! notice_ttl = "4s"
//! compaction_notice_timeout = "1m"
//! warning_percent = 85.0
//! critical_percent = 95.0
//! thinking_mode = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Directive prefixed to the user's request when AutoMode starts planning.
pub const DEFAULT_PLAN_DIRECTIVE: &str = "Produce a step-by-step implementation plan for the \
following request. Do not modify any files yet; only describe the plan.";

/// Fixed request sent automatically once the planning phase completes.
pub const DEFAULT_EXECUTE_DIRECTIVE: &str = "Execute the plan above autonomously. Implement \
every step without asking for confirmation and report what was changed when you are done.";

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`Config`].
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Orchestrator configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tether::types::config::Config;
///
/// let config = Config::default()
///     .with_status_tick(Duration::from_millis(250))
///     .with_thinking_mode(true);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.warning_percent, 85.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Period of the status-refresh tick while a request is processing.
    #[serde(with = "humantime_duration")]
    pub status_tick: Duration,

    /// How long informational notices stay visible.
    #[serde(with = "humantime_duration")]
    pub notice_ttl: Duration,

    /// UX timeout for a compaction notice the host never answers.
    #[serde(with = "humantime_duration")]
    pub compaction_notice_timeout: Duration,

    /// Context usage (percent) at which the warning band starts.
    pub warning_percent: f64,

    /// Context usage (percent) at which the critical band starts and the host
    /// is expected to auto-compact.
    pub critical_percent: f64,

    /// Text prefixed to the user's request in the AutoMode planning phase.
    pub plan_directive: String,

    /// Text sent on its own for the AutoMode execution phase.
    pub execute_directive: String,

    /// Whether requests ask the host for extended thinking.
    pub thinking_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            status_tick: Duration::from_millis(100),
            notice_ttl: Duration::from_secs(4),
            compaction_notice_timeout: Duration::from_secs(60),
            warning_percent: 85.0,
            critical_percent: 95.0,
            plan_directive: DEFAULT_PLAN_DIRECTIVE.to_string(),
            execute_directive: DEFAULT_EXECUTE_DIRECTIVE.to_string(),
            thinking_mode: false,
        }
    }
}

impl Config {
    /// Loads a configuration file.
    ///
    /// A missing file is not an error: defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Returns the default config path (`<config_dir>/config.toml`).
    ///
    /// Returns `None` if the platform config directory cannot be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        crate::util::get_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a threshold or duration is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.warning_percent > 0.0 && self.warning_percent < self.critical_percent) {
            return Err(ConfigError::Invalid(format!(
                "warning_percent must be in (0, critical_percent), got {}",
                self.warning_percent
            )));
        }
        if self.critical_percent > 100.0 {
            return Err(ConfigError::Invalid(format!(
                "critical_percent must be at most 100, got {}",
                self.critical_percent
            )));
        }
        if self.status_tick.is_zero() {
            return Err(ConfigError::Invalid(
                "status_tick must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the status tick period.
    #[must_use]
    pub fn with_status_tick(mut self, tick: Duration) -> Self {
        self.status_tick = tick;
        self
    }

    /// Sets the notice time-to-live.
    #[must_use]
    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    /// Sets whether thinking mode is requested.
    #[must_use]
    pub fn with_thinking_mode(mut self, enabled: bool) -> Self {
        self.thinking_mode = enabled;
        self
    }
}

/// Serde adapter for humantime-formatted durations.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
