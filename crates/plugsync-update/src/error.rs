//! Error types for the update pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using plugsync-update's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Failures of a single update cycle
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Bad constructor or setter argument
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Commit-list endpoint reported the repository as missing
    #[error("Repository not found: {repository}")]
    RepositoryNotFound { repository: String },

    /// Commit-list or archive endpoint returned an error payload
    #[error("Upstream error for {repository}: {message}")]
    Upstream { repository: String, message: String },

    /// Redirect response without a usable target
    #[error("Redirect from {url} carried no Location header")]
    RedirectWithoutLocation { url: String },

    /// Redirect chain exceeded the configured hop limit
    #[error("Too many redirects ({hops}) while downloading {url}")]
    TooManyRedirects { url: String, hops: u32 },

    /// Temp directory could not be created or located
    #[error("Temporary directory unavailable at {path}: {source}")]
    TempDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a downloaded or generated file failed
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Download produced no data
    #[error("Downloaded archive {file_name} is empty")]
    EmptyDownload { file_name: String },

    /// Archive could not be unpacked or its folder located
    #[error("Failed to extract archive: {message}")]
    Extraction { message: String },

    /// No file in the package exposes a plugin header
    #[error("No plugin manifest found in {folder}")]
    NoManifestFound { folder: PathBuf },

    /// The same plugin is already active under the other scope
    #[error("Plugin {plugin} is already active in the {scope} scope")]
    DuplicateInstallation { plugin: String, scope: String },

    /// Moving the extracted folder to its canonical name failed
    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host plugin API failure
    #[error("Host error: {message}")]
    Host { message: String },

    /// Option store failure
    #[error("Option store error: {message}")]
    Store { message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdateError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error
    pub fn upstream(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create a host error
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
