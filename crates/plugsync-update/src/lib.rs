//! Plugin auto-update pipeline for plugsync
//!
//! Provides:
//! - Revision checks against a repository's commit history
//! - Archive download with bounded redirect following
//! - Zip installation with folder normalization and duplicate detection
//! - Install-record bookkeeping in a host-owned option store
//! - Linker-file generation for shared-scope ("must-use") installs

pub mod checker;
pub mod download;
pub mod error;
pub mod host;
pub mod installer;
pub mod recorder;
pub mod repository;
pub mod store;
pub mod updater;

pub use checker::{UpdateCheck, VersionChecker};
pub use download::{ArchiveFetcher, DownloadResult};
pub use error::{Result, UpdateError};
pub use host::{ManifestInfo, PluginHost};
pub use installer::{ArchiveInstaller, InstalledPlugin};
pub use plugsync_core::types::InstallScope;
pub use recorder::StateRecorder;
pub use repository::RepositoryRef;
pub use store::{InstallRecord, InstallState, JsonFileStore, MemoryStore, OptionStore};
pub use updater::{PluginUpdater, UpdateOutcome, UpdaterOptions};
