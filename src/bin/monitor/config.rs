//! Monitor Configuration
//!
//! Locates and loads the application configuration.

use kuba_congestion::config::ApplicationConfig;
use kuba_congestion::error::ValidationError;
use std::path::{Path, PathBuf};

/// Environment variable holding the config file path
pub const CONFIG_ENV: &str = "CONGESTION_CONFIG";

/// Default config file in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "congestion.toml";

/// Configuration as read, before command-line overrides and validation
pub struct LoadedConfig {
    /// File and environment settings
    pub config: ApplicationConfig,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
    /// Environment values that failed to parse and were ignored
    pub env_issues: Vec<ValidationError>,
}

/// Load configuration from file or environment
///
/// Priority:
/// 1. Explicit path (`--config`)
/// 2. CONGESTION_CONFIG environment variable
/// 3. congestion.toml in the working directory
/// 4. Default configuration
///
/// Environment overrides are applied in every case. An explicitly named
/// file that cannot be read is an error; the implicit ones are optional.
/// Nothing is validated here: the caller validates once every override
/// has been applied.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, kuba_congestion::Error> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = match named {
        Some(path) => Some(path),
        None if default_path.exists() => Some(default_path.to_path_buf()),
        None => None,
    };

    let mut config = match &path {
        Some(p) => ApplicationConfig::from_file(p)?,
        None => ApplicationConfig::default(),
    };
    let env_issues = config.apply_env_overrides_checked();

    Ok(LoadedConfig {
        config,
        path,
        env_issues,
    })
}
