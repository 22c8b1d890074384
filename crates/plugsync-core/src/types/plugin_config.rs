//! Tracked plugin definitions (plugins.yaml)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where a plugin is installed and how the host loads it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallScope {
    /// Regular plugins directory, activated through the host
    #[default]
    Standard,

    /// Must-use directory, loaded from top-level files without activation
    #[serde(alias = "must-use", alias = "mu")]
    Shared,
}

impl InstallScope {
    /// The opposite scope, used for cross-scope duplicate detection
    pub fn other(self) -> Self {
        match self {
            Self::Standard => Self::Shared,
            Self::Shared => Self::Standard,
        }
    }
}

impl fmt::Display for InstallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

impl FromStr for InstallScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "shared" | "must-use" | "mu" => Ok(Self::Shared),
            other => Err(Error::invalid_config(format!(
                "Unknown install scope '{}'. Valid scopes: standard, shared",
                other
            ))),
        }
    }
}

/// One repository tracked by the updater
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackedPlugin {
    /// Repository coordinate, either `owner/name` or just the owner
    pub repository: String,

    /// Repository name when `repository` only holds the owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Plugins directory the archive is unpacked into
    pub destination: PathBuf,

    /// Install scope
    #[serde(default)]
    pub scope: InstallScope,

    /// Install automatically when an update is found
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,

    /// Access token for this repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Environment variable holding the access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
}

fn default_auto_update() -> bool {
    true
}

impl TrackedPlugin {
    /// Owner and name, splitting a combined `owner/name` coordinate
    pub fn coordinates(&self) -> Result<(String, String)> {
        let repository = self.repository.trim();
        if repository.is_empty() {
            return Err(Error::missing_field("repository"));
        }

        let (owner, name) = match repository.split_once('/') {
            Some((owner, name)) => (owner.trim(), name.trim()),
            None => (
                repository,
                self.name.as_deref().map(str::trim).unwrap_or_default(),
            ),
        };

        if owner.is_empty() || name.is_empty() {
            return Err(Error::invalid_plugin(
                &self.repository,
                "expected 'owner/name' or a separate 'name' field",
            ));
        }

        Ok((owner.to_string(), name.to_string()))
    }

    /// `owner/name` key used for install records
    pub fn key(&self) -> Result<String> {
        let (owner, name) = self.coordinates()?;
        Ok(format!("{}/{}", owner, name))
    }

    /// Token from the entry itself or its environment variable
    pub fn resolve_token(&self) -> Option<String> {
        if let Some(token) = self.access_token.as_deref().map(str::trim) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }

        self.access_token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<()> {
        self.coordinates()?;
        if self.destination.as_os_str().is_empty() {
            return Err(Error::invalid_plugin(
                &self.repository,
                "destination must not be empty",
            ));
        }
        Ok(())
    }
}

/// Contents of plugins.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginsConfig {
    /// Tracked repositories
    #[serde(default)]
    pub plugins: Vec<TrackedPlugin>,
}

impl PluginsConfig {
    /// Validate every entry and reject duplicate repositories
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for plugin in &self.plugins {
            plugin.validate()?;
            let key = plugin.key()?.to_lowercase();
            if !seen.insert(key) {
                return Err(Error::invalid_plugin(
                    &plugin.repository,
                    "repository is listed more than once",
                ));
            }
        }
        Ok(())
    }

    /// Find a tracked plugin by `owner/name` (case-insensitive)
    pub fn find(&self, key: &str) -> Option<&TrackedPlugin> {
        self.plugins.iter().find(|p| {
            p.key()
                .map(|k| k.eq_ignore_ascii_case(key.trim()))
                .unwrap_or(false)
        })
    }
}
