//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is a single TOML file per service. Resolution
//! priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`~/.config/streetlight/<file>`)
//! 4. System config directory (`/etc/streetlight/<file>`, Linux only)
//!
//! If none of these yields a file the service runs on built-in defaults.
//! An explicitly named file (CLI or environment) that does not exist is an
//! error; a discovered file is only used when present.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used under the platform config directory
pub const CONFIG_DIR_NAME: &str = "streetlight";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `sl_rv=debug,tower_http=info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
    SystemConfigDir,
}

impl ConfigSource {
    fn is_explicit(self) -> bool {
        matches!(self, ConfigSource::CommandLine | ConfigSource::Environment)
    }
}

/// Resolve the config file path following the priority order above
///
/// Returns `None` when nothing was named explicitly and no file exists in
/// the default locations.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<(PathBuf, ConfigSource)> {
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), ConfigSource::CommandLine));
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some((PathBuf::from(path), ConfigSource::Environment));
        }
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name)) {
        if user_config.exists() {
            return Some((user_config, ConfigSource::UserConfigDir));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some((system_config, ConfigSource::SystemConfigDir));
        }
    }

    debug!(file_name, "No config file found, using built-in defaults");
    None
}

/// Parse a TOML config file into `T`
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config {} failed: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config {} failed: {}", path.display(), e)))
}

/// Load configuration from a resolved location, falling back to defaults
///
/// A missing file is only tolerated for discovered (non-explicit) locations.
pub fn load_or_default<T: DeserializeOwned + Default>(
    resolved: Option<(PathBuf, ConfigSource)>,
) -> Result<T> {
    match resolved {
        Some((path, source)) => {
            if !path.exists() {
                if source.is_explicit() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                return Ok(T::default());
            }
            let config = load_toml_config(&path)?;
            info!(path = %path.display(), ?source, "Loaded configuration");
            Ok(config)
        }
        None => Ok(T::default()),
    }
}
