//! Hierarchical configuration loader with precedence
//!
//! Loads runtime configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Runtime config (~/.plugsync/runtime.yaml)
//! 3. Environment variables (PLUGSYNC_* prefix)
//! 4. CLI flags (handled by caller)
//!
//! Tracked plugins are read from ~/.plugsync/plugins.yaml unless the caller
//! points at another file.

use crate::error::{Error, Result};
use crate::types::{PluginsConfig, RuntimeConfig};
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const RUNTIME_CONFIG_FILE: &str = "runtime.yaml";
const PLUGINS_CONFIG_FILE: &str = "plugins.yaml";
const STATE_FILE: &str = "state.json";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a new hierarchical config loader
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.plugsync)
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = get_home_dir().map_err(|e| Error::invalid_config(e.to_string()))?;
        let home = Utf8PathBuf::from_path_buf(home).map_err(|p| {
            Error::invalid_config(format!("Home directory is not UTF-8: {}", p.display()))
        })?;

        let config_dir = home.join(".plugsync");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(config_dir)
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        let runtime_config_path = self.config_dir.join(RUNTIME_CONFIG_FILE);
        if runtime_config_path.exists() {
            debug!("Loading runtime config from {}", runtime_config_path);
            let file_config = self.load_yaml_file::<RuntimeConfig>(&runtime_config_path)?;
            config = Self::merge_runtime_config(config, file_config);
        }

        config = self.apply_env_overrides(config)?;

        Ok(config)
    }

    /// Load tracked plugins
    ///
    /// An explicit path must exist. The default location may be absent, in
    /// which case no plugins are tracked.
    pub fn load_plugins_config(&self, path: Option<&Utf8Path>) -> Result<PluginsConfig> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_not_found(path.as_str()));
                }
                self.load_yaml_file::<PluginsConfig>(path)?
            }
            None => {
                let default_path = self.config_dir.join(PLUGINS_CONFIG_FILE);
                if !default_path.exists() {
                    debug!("No plugins config at {}", default_path);
                    return Ok(PluginsConfig::default());
                }
                self.load_yaml_file::<PluginsConfig>(&default_path)?
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Option store file, honouring `paths.state-file`
    pub fn state_file(&self, config: &RuntimeConfig) -> PathBuf {
        config
            .paths
            .state_file
            .clone()
            .unwrap_or_else(|| self.config_dir.join(STATE_FILE).into_std_path_buf())
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        let config: T = serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            network: overlay.network,
            github: crate::types::GitHubConfig {
                token: overlay.github.token.or(base.github.token),
                ..overlay.github
            },
            paths: crate::types::PathsConfig {
                temp_dir: overlay.paths.temp_dir.or(base.paths.temp_dir),
                state_file: overlay.paths.state_file.or(base.paths.state_file),
            },
            display: overlay.display,
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("PLUGSYNC_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("PLUGSYNC_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("PLUGSYNC_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("PLUGSYNC_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("PLUGSYNC_CONNECT_TIMEOUT_SECS") {
            config.network.connect_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("PLUGSYNC_CONNECT_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("PLUGSYNC_MAX_REDIRECTS") {
            config.network.max_redirects = val.parse().map_err(|_| {
                Error::invalid_config("PLUGSYNC_MAX_REDIRECTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("PLUGSYNC_GITHUB_API_URL") {
            config.github.api_url = val;
        }

        if let Ok(val) = env::var("PLUGSYNC_BRANCH") {
            config.github.branch = val;
        }

        if let Ok(val) = env::var("PLUGSYNC_GITHUB_TOKEN") {
            if !val.trim().is_empty() {
                config.github.token = Some(val.trim().to_string());
            }
        }

        if let Ok(val) = env::var("PLUGSYNC_TEMP_DIR") {
            config.paths.temp_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("PLUGSYNC_STATE_FILE") {
            config.paths.state_file = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("PLUGSYNC_NO_COLOR") {
            config.display.color_enabled = !val.parse().unwrap_or(false);
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
