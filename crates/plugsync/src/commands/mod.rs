//! CLI command implementations

pub mod check;
pub mod install;
pub mod status;
pub mod update;
pub mod version;

use anyhow::{anyhow, Context as _, Result};
use camino::Utf8PathBuf;
use plugsync_core::types::{PluginsConfig, RuntimeConfig, TrackedPlugin};
use plugsync_core::HierarchicalConfigLoader;
use plugsync_update::{JsonFileStore, OptionStore, PluginHost, PluginUpdater, UpdaterOptions};
use std::sync::Arc;
use tracing::debug;

use crate::host::StandaloneHost;

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<Utf8PathBuf>,
    pub state: Option<Utf8PathBuf>,
    pub quiet: bool,
}

/// Loaded configuration plus the state store and host every command uses
pub struct Context {
    pub runtime: RuntimeConfig,
    pub plugins: PluginsConfig,
    pub store: Arc<dyn OptionStore>,
    pub host: Arc<dyn PluginHost>,
    pub quiet: bool,
}

impl Context {
    /// Load configuration and open the state file
    pub fn load(global: &GlobalOptions) -> Result<Self> {
        let loader = HierarchicalConfigLoader::new().context("Failed to locate config directory")?;
        let mut runtime = loader
            .load_runtime_config()
            .context("Failed to load runtime configuration")?;
        if let Some(state) = &global.state {
            runtime.paths.state_file = Some(state.clone().into_std_path_buf());
        }

        let plugins = loader
            .load_plugins_config(global.config.as_deref())
            .context("Failed to load plugins configuration")?;

        if !runtime.display.color_enabled {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        let state_file = loader.state_file(&runtime);
        debug!("Using state file {}", state_file.display());
        let store: Arc<dyn OptionStore> = Arc::new(JsonFileStore::new(state_file));
        let host: Arc<dyn PluginHost> = Arc::new(StandaloneHost::new(store.clone()));

        Ok(Self {
            runtime,
            plugins,
            store,
            host,
            quiet: global.quiet,
        })
    }

    /// Tracked plugins, or the one named by `repository`
    pub fn selected(&self, repository: Option<&str>) -> Result<Vec<&TrackedPlugin>> {
        match repository {
            Some(key) => self
                .plugins
                .find(key)
                .map(|plugin| vec![plugin])
                .ok_or_else(|| anyhow!("Repository {} is not tracked", key)),
            None => Ok(self.plugins.plugins.iter().collect()),
        }
    }

    /// Updater for a tracked plugin; `force` enables installs regardless of
    /// the entry's auto-update flag
    pub fn tracked_updater(&self, plugin: &TrackedPlugin, force: bool) -> Result<PluginUpdater> {
        let mut options =
            UpdaterOptions::from_tracked(plugin, self.runtime.github.token.as_deref())?;
        if force {
            options.set_auto_run(true);
        }
        self.updater(options)
    }

    /// Updater from prepared options
    pub fn updater(&self, options: UpdaterOptions) -> Result<PluginUpdater> {
        let updater = PluginUpdater::new(
            options,
            &self.runtime,
            self.store.clone(),
            self.host.clone(),
        )?;
        Ok(updater.with_progress(self.runtime.display.show_progress && !self.quiet))
    }
}

/// Error for a batch in which some cycles failed
pub(crate) fn batch_failure(failed: usize, total: usize, verb: &str) -> Result<()> {
    if failed == 0 {
        return Ok(());
    }
    Err(anyhow!("{} of {} {} failed", failed, total, verb))
}

/// Short form of a recorded hash, `-` for none
pub(crate) fn display_hash(hash: Option<&str>) -> String {
    match hash {
        Some(hash) if hash != plugsync_update::store::PLACEHOLDER_HASH => {
            plugsync_update::checker::short_hash(hash).to_string()
        }
        _ => "-".to_string(),
    }
}
