//! Host plugin API consumed by the updater

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Package metadata declared in a plugin's header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestInfo {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_uri: String,
}

/// Plugin registry of the host platform
///
/// Plugin ids are paths relative to the plugins directory, `folder/file`.
pub trait PluginHost: Send + Sync {
    /// Parse the plugin header of `file`; `None` when it declares no plugin
    fn parse_manifest(&self, file: &Path) -> Option<ManifestInfo>;

    /// Activate a standard-scope plugin
    fn activate(&self, plugin_id: &str) -> Result<()>;

    /// Ids of active standard-scope plugins
    fn active_plugins(&self) -> Result<Vec<String>>;
}
