//! Configuration management for the congestion monitor
//!
//! TOML file support, environment variable overrides, and sensible defaults.
//!
//! ```toml
//! [pipeline]
//! queue_capacity = 50
//! window_duration_ms = 3600000
//! top_n = 3
//!
//! [input]
//! path = "TrafficDataFile.txt"
//!
//! [output]
//! format = "text"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::aggregation::MAX_TOP_N;
use crate::error::{Error, Result, ValidationError};
use crate::ingestion::queue::MAX_QUEUE_CAPACITY;
use crate::sink::OutputFormat;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CONGESTION_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// Queue and aggregation settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum records buffered between ingestion and analysis
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Aggregation window length in milliseconds
    #[serde(default = "default_window_duration_ms")]
    pub window_duration_ms: i64,

    /// Records reported per window
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// Input configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputConfig {
    /// Input file (stdin when unset or "-")
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Maximum accepted line length in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Reject lines with extra fields
    #[serde(default = "default_true")]
    pub reject_trailing: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Report format (text, json)
    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_queue_capacity() -> usize { 50 }
fn default_window_duration_ms() -> i64 { 3_600_000 }
fn default_top_n() -> usize { 3 }
fn default_max_line_length() -> usize { 64 * 1024 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            window_duration_ms: default_window_duration_ms(),
            top_n: default_top_n(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_line_length: default_max_line_length(),
            reject_trailing: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Validate queue and aggregation bounds
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ValidationError::OutOfRange {
                field: "queue_capacity".to_string(),
                value: self.queue_capacity.to_string(),
                min: "1".to_string(),
                max: MAX_QUEUE_CAPACITY.to_string(),
            }
            .into());
        }
        if self.window_duration_ms <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "window_duration_ms".to_string(),
                value: self.window_duration_ms.to_string(),
                min: "1".to_string(),
                max: i64::MAX.to_string(),
            }
            .into());
        }
        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            return Err(ValidationError::OutOfRange {
                field: "top_n".to_string(),
                value: self.top_n.to_string(),
                min: "1".to_string(),
                max: MAX_TOP_N.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ApplicationConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&contents).map_err(|e| match e {
            Error::Configuration(msg) => {
                Error::Configuration(format!("{}: {}", path.display(), msg))
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration with environment variable overrides, then validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Values that fail to parse are skipped with a warning.
    pub fn apply_env_overrides(&mut self) {
        for issue in self.apply_env_overrides_checked() {
            warn!(%issue, "Ignoring environment override");
        }
    }

    /// Apply environment variable overrides, returning the rejected ones
    ///
    /// For callers that load configuration before logging is set up and
    /// report the rejected values afterwards.
    pub fn apply_env_overrides_checked(&mut self) -> Vec<ValidationError> {
        let mut issues = Vec::new();

        if let Some(v) = env_parse("QUEUE_CAPACITY", &mut issues) {
            self.pipeline.queue_capacity = v;
        }
        if let Some(v) = env_parse("WINDOW_MS", &mut issues) {
            self.pipeline.window_duration_ms = v;
        }
        if let Some(v) = env_parse("TOP_N", &mut issues) {
            self.pipeline.top_n = v;
        }
        if let Ok(path) = std::env::var(format!("{}INPUT", ENV_PREFIX)) {
            self.input.path = Some(PathBuf::from(path));
        }
        if let Some(format) = env_parse("FORMAT", &mut issues) {
            self.output.format = format;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }

        issues
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;

        if self.input.max_line_length == 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_line_length".to_string(),
                value: "0".to_string(),
                min: "1".to_string(),
                max: usize::MAX.to_string(),
            }
            .into());
        }
        if self.logging.level.trim().is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "logging.level".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

/// Read and parse `CONGESTION_<suffix>`, recording a parse failure
fn env_parse<T>(suffix: &str, issues: &mut Vec<ValidationError>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let key = format!("{}{}", ENV_PREFIX, suffix);
    let raw = std::env::var(&key).ok()?;

    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            issues.push(ValidationError::InvalidFormat {
                field: key,
                message: format!("'{}': {}", raw, e),
            });
            None
        },
    }
}
