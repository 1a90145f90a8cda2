//! Configuration file discovery and TOML loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`<config_dir>/geoloc/<module>.toml`)
//! 4. System config directory (`/etc/geoloc/<module>.toml`, Linux only)
//!
//! Explicitly requested files (1, 2) must exist. Discovered files (3, 4) are optional:
//! when none is found the caller falls back to compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default environment variable naming an explicit config file
pub const DEFAULT_CONFIG_ENV_VAR: &str = "GEOLOC_CONFIG";

/// Logging section shared by all geoloc TOML files
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserDirectory,
    SystemDirectory,
}

impl ConfigSource {
    /// Explicit sources must point to an existing file
    pub fn is_explicit(self) -> bool {
        matches!(self, ConfigSource::CommandLine | ConfigSource::Environment)
    }
}

/// Locates the TOML config file for one module
#[derive(Debug, Clone)]
pub struct ConfigFileLocator {
    module_name: String,
    env_var_name: String,
}

impl ConfigFileLocator {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            env_var_name: DEFAULT_CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Override the environment variable consulted at priority 2
    pub fn with_env_var(mut self, env_var_name: impl Into<String>) -> Self {
        self.env_var_name = env_var_name.into();
        self
    }

    /// Resolve the config file path, or `None` when no file applies
    pub fn locate(&self, cli_arg: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some((path.to_path_buf(), ConfigSource::CommandLine));
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some((PathBuf::from(path), ConfigSource::Environment));
            }
        }

        // Priority 3: User config directory
        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return Some((path, ConfigSource::UserDirectory));
            }
        }

        // Priority 4: System config directory
        if let Some(path) = self.system_config_path() {
            if path.exists() {
                return Some((path, ConfigSource::SystemDirectory));
            }
        }

        None
    }

    fn file_name(&self) -> String {
        format!("{}.toml", self.module_name)
    }

    fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("geoloc").join(self.file_name()))
    }

    fn system_config_path(&self) -> Option<PathBuf> {
        if cfg!(target_os = "linux") {
            Some(PathBuf::from("/etc/geoloc").join(self.file_name()))
        } else {
            None
        }
    }
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate and load a module's TOML config
///
/// Returns `T::default()` when no file is found. A missing explicit file, or any
/// unreadable/unparsable file, is a configuration error.
pub fn load_module_config<T>(locator: &ConfigFileLocator, cli_arg: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some((path, source)) = locator.locate(cli_arg) else {
        warn!(
            module = %locator.module_name,
            "No config file found, using compiled defaults"
        );
        return Ok(T::default());
    };

    if source.is_explicit() && !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {} (from {:?})",
            path.display(),
            source
        )));
    }

    debug!(path = %path.display(), ?source, "Loading config file");
    let config = load_toml(&path)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Standard User-Agent for outbound HTTP clients
pub fn user_agent(module_name: &str) -> String {
    format!("{}/{}", module_name, env!("CARGO_PKG_VERSION"))
}
