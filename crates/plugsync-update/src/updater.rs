//! Update cycle orchestration
//!
//! One cycle is a strictly sequential pipeline:
//! 1. Check the newest revision against the stored record
//! 2. Take the per-repository lock and re-read the record
//! 3. Download the branch archive
//! 4. Install it into the destination
//! 5. Record the install and activate the plugin
//!
//! Nothing is written when the upstream revision is unchanged.

use fs4::fs_std::FileExt;
use plugsync_core::types::{InstallScope, RuntimeConfig, TrackedPlugin};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::checker::{needs_update, short_hash, UpdateCheck, VersionChecker};
use crate::download::ArchiveFetcher;
use crate::error::{Result, UpdateError};
use crate::host::PluginHost;
use crate::installer::{ArchiveInstaller, InstalledPlugin};
use crate::recorder::StateRecorder;
use crate::repository::{require_non_empty, RepositoryRef};
use crate::store::{InstallState, OptionStore, PLACEHOLDER_HASH};

/// Construction-time settings of a [`PluginUpdater`]
#[derive(Debug, Clone, Default)]
pub struct UpdaterOptions {
    destination: Option<PathBuf>,
    owner: Option<String>,
    name: Option<String>,
    access_token: Option<String>,
    auto_run: bool,
    scope: InstallScope,
}

impl UpdaterOptions {
    /// Empty options; destination, owner and name must be set
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a tracked plugin entry
    ///
    /// `default_token` applies when the entry carries no token of its own.
    pub fn from_tracked(plugin: &TrackedPlugin, default_token: Option<&str>) -> Result<Self> {
        let (owner, name) = plugin
            .coordinates()
            .map_err(|e| UpdateError::validation("repository", e.to_string()))?;

        let mut options = Self::new();
        options.set_destination(&plugin.destination)?;
        options.set_repository_owner(&owner)?;
        options.set_repository_name(&name)?;
        options.set_auto_run(plugin.auto_update);
        options.set_scope(plugin.scope);
        if let Some(token) = plugin.resolve_token().as_deref().or(default_token) {
            options.set_access_token(token)?;
        }
        Ok(options)
    }

    /// Plugins directory the archive is unpacked into
    pub fn set_destination(&mut self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        require_non_empty("destination", &destination.to_string_lossy())?;
        self.destination = Some(destination.to_path_buf());
        Ok(())
    }

    /// Repository owner; `owner/name` also sets the name
    pub fn set_repository_owner(&mut self, owner: &str) -> Result<()> {
        match owner.trim().split_once('/') {
            Some((owner, name)) => {
                let owner = require_non_empty("owner", owner)?;
                let name = require_non_empty("name", name)?;
                self.owner = Some(owner);
                self.name = Some(name);
            }
            None => self.owner = Some(require_non_empty("owner", owner)?),
        }
        Ok(())
    }

    /// Repository name
    pub fn set_repository_name(&mut self, name: &str) -> Result<()> {
        self.name = Some(require_non_empty("name", name)?);
        Ok(())
    }

    /// Token used against the API for rate-limit relief
    pub fn set_access_token(&mut self, token: &str) -> Result<()> {
        self.access_token = Some(require_non_empty("access token", token)?);
        Ok(())
    }

    /// Install automatically when an update is found
    pub fn set_auto_run(&mut self, auto_run: bool) {
        self.auto_run = auto_run;
    }

    /// Install scope
    pub fn set_scope(&mut self, scope: InstallScope) {
        self.scope = scope;
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn repository_owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn auto_run(&self) -> bool {
        self.auto_run
    }

    pub fn scope(&self) -> InstallScope {
        self.scope
    }

    /// Repository these options point at
    pub fn repository(&self) -> Result<RepositoryRef> {
        let owner = self
            .owner
            .as_deref()
            .ok_or_else(|| UpdateError::validation("owner", "not set"))?;
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| UpdateError::validation("name", "not set"))?;
        RepositoryRef::new(owner, name)
    }
}

/// Result of a full update cycle
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// Installed revision is current
    UpToDate { revision: String },

    /// A newer revision exists but automatic install is off
    UpdateAvailable {
        revision: String,
        installed: Option<String>,
    },

    /// A new revision was installed
    Installed {
        revision: String,
        previous: Option<String>,
        plugin: InstalledPlugin,
    },
}

impl UpdateOutcome {
    /// Upstream revision the cycle saw
    pub fn revision(&self) -> &str {
        match self {
            Self::UpToDate { revision }
            | Self::UpdateAvailable { revision, .. }
            | Self::Installed { revision, .. } => revision,
        }
    }

    /// Whether the cycle installed anything
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Keeps one repository's update pipeline
pub struct PluginUpdater {
    repo: RepositoryRef,
    destination: PathBuf,
    scope: InstallScope,
    auto_run: bool,
    token: Option<String>,
    state: InstallState,
    checker: VersionChecker,
    fetcher: ArchiveFetcher,
    installer: ArchiveInstaller,
    recorder: StateRecorder,
}

impl PluginUpdater {
    /// Create an updater
    pub fn new(
        options: UpdaterOptions,
        config: &RuntimeConfig,
        store: Arc<dyn OptionStore>,
        host: Arc<dyn PluginHost>,
    ) -> Result<Self> {
        let repo = options.repository()?;
        let destination = options
            .destination
            .clone()
            .ok_or_else(|| UpdateError::validation("destination", "not set"))?;
        let state = InstallState::new(store);

        debug!(
            "Updater initialized: repo={}, destination={:?}, scope={}",
            repo, destination, options.scope
        );

        Ok(Self {
            repo,
            destination,
            scope: options.scope,
            auto_run: options.auto_run,
            token: options.access_token,
            checker: VersionChecker::new(config)?,
            fetcher: ArchiveFetcher::new(config)?,
            installer: ArchiveInstaller::new(host.clone(), state.clone()),
            recorder: StateRecorder::new(host, state.clone()),
            state,
        })
    }

    /// Enable or disable download progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.fetcher = self.fetcher.with_progress(show);
        self
    }

    pub fn repository(&self) -> &RepositoryRef {
        &self.repo
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn scope(&self) -> InstallScope {
        self.scope
    }

    /// Check for a newer revision without installing
    pub async fn check(&self) -> Result<UpdateCheck> {
        self.checker
            .check_for_update(&self.repo, self.token.as_deref(), &self.state)
            .await
    }

    /// Run one update cycle
    pub async fn run(&self) -> Result<UpdateOutcome> {
        let check = self.check().await?;
        let installed = check
            .previous
            .as_ref()
            .map(|record| record.hash.clone())
            .filter(|hash| hash != PLACEHOLDER_HASH);

        if !check.has_update {
            return Ok(UpdateOutcome::UpToDate {
                revision: check.revision,
            });
        }

        if !self.auto_run {
            info!(
                "Update for {} available ({}), automatic install disabled",
                self.repo,
                short_hash(&check.revision)
            );
            return Ok(UpdateOutcome::UpdateAvailable {
                revision: check.revision,
                installed,
            });
        }

        let _lock = UpdateLock::acquire(self.fetcher.temp_root(), &self.repo).await?;

        let current = self.state.record(&self.repo.key())?;
        if !needs_update(current.as_ref(), &check.revision) {
            info!("{} was updated by another cycle", self.repo);
            return Ok(UpdateOutcome::UpToDate {
                revision: check.revision,
            });
        }

        let download = self.fetcher.fetch(&self.repo, self.token.as_deref()).await?;
        let plugin = self
            .installer
            .install(&download, &self.repo, &self.destination, self.scope)?;
        drop(download);

        self.recorder.record_install(
            &self.repo,
            &check.revision,
            &plugin.manifest_file,
            &plugin.folder,
            self.scope,
        )?;

        info!(
            "Updated {} to {}",
            self.repo,
            short_hash(&check.revision)
        );

        Ok(UpdateOutcome::Installed {
            revision: check.revision,
            previous: installed,
            plugin,
        })
    }
}

/// Exclusive advisory lock serialising install cycles of one repository
///
/// Released when dropped. The lock file itself is left in place.
struct UpdateLock {
    _file: File,
}

impl UpdateLock {
    /// Waits for the lock on the blocking pool so other cycles on the same
    /// runtime keep making progress while this one is parked.
    async fn acquire(root: &Path, repo: &RepositoryRef) -> Result<Self> {
        fs::create_dir_all(root).map_err(|source| UpdateError::TempDirUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

        let path = root.join(format!("{}.lock", repo.folder_prefix().to_lowercase()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        debug!("Waiting for update lock {}", path.display());
        let file = tokio::task::spawn_blocking(move || file.lock_exclusive().map(|()| file))
            .await
            .map_err(|e| UpdateError::Io(std::io::Error::other(e.to_string())))??;
        debug!("Acquired update lock {}", path.display());
        Ok(Self { _file: file })
    }
}
