//! Runtime configuration types for operational parameters
//!
//! These types define configuration that controls runtime behavior like
//! network timeouts, redirect limits, the code-hosting API and where
//! temporary downloads and install state live.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Code-hosting API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Display and output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for API requests in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for archive downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects followed for one download
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_max_redirects() -> u32 {
    5
}
fn default_user_agent() -> String {
    format!(
        "plugsync/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Code-hosting API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// Prefix for repository endpoints (`{api-url}/{owner}/{repo}/...`)
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Branch whose archive is downloaded
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Access token used when a tracked plugin does not carry its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            branch: default_branch(),
            token: None,
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com/repos".to_string()
}
fn default_branch() -> String {
    "master".to_string()
}

/// Filesystem locations used by the updater
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Root for per-cycle download directories and lock files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// JSON file backing the option store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl PathsConfig {
    /// Temp root, falling back to `<system temp>/plugsync`
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("plugsync"))
    }
}

/// Display and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Enable colored output
    #[serde(default = "default_color_enabled")]
    pub color_enabled: bool,

    /// Show download progress bars
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color_enabled: default_color_enabled(),
            show_progress: default_show_progress(),
        }
    }
}

fn default_color_enabled() -> bool {
    true
}
fn default_show_progress() -> bool {
    true
}
