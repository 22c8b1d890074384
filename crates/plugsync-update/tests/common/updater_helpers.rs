//! Per-test environment for full update cycles

use plugsync_core::types::{InstallScope, RuntimeConfig};
use plugsync_update::{InstallState, OptionStore, PluginHost, PluginUpdater, UpdaterOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

use super::constants::*;
use super::fakes::{CountingStore, FakeHost};
use super::mock_server::api_url;

/// Runtime configuration pointed at a mock API and a private temp root
pub fn test_config(api_url: &str, temp_root: &Path) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.github.api_url = api_url.to_string();
    config.paths.temp_dir = Some(temp_root.to_path_buf());
    config.network.http_timeout_secs = 5;
    config.network.download_timeout_secs = 5;
    config.display.show_progress = false;
    config
}

/// Mock server, scratch directories and fakes for one test
pub struct TestEnv {
    pub server: MockServer,
    pub temp: TempDir,
    pub store: Arc<CountingStore>,
    pub host: Arc<FakeHost>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_host(FakeHost::new()).await
    }

    pub async fn with_host(host: FakeHost) -> Self {
        Self {
            server: MockServer::start().await,
            temp: TempDir::new().unwrap(),
            store: Arc::new(CountingStore::new()),
            host: Arc::new(host),
        }
    }

    /// Standard-scope plugins directory
    pub fn plugins_dir(&self) -> PathBuf {
        self.temp.path().join("plugins")
    }

    /// Shared-scope plugins directory
    pub fn mu_dir(&self) -> PathBuf {
        self.temp.path().join("mu-plugins")
    }

    /// Download temp root
    pub fn temp_root(&self) -> PathBuf {
        self.temp.path().join("tmp")
    }

    pub fn config(&self) -> RuntimeConfig {
        test_config(&api_url(&self.server), &self.temp_root())
    }

    pub fn option_store(&self) -> Arc<dyn OptionStore> {
        self.store.clone()
    }

    pub fn plugin_host(&self) -> Arc<dyn PluginHost> {
        self.host.clone()
    }

    pub fn state(&self) -> InstallState {
        InstallState::new(self.option_store())
    }

    /// Destination directory for `scope`
    pub fn destination(&self, scope: InstallScope) -> PathBuf {
        match scope {
            InstallScope::Standard => self.plugins_dir(),
            InstallScope::Shared => self.mu_dir(),
        }
    }

    /// Updater for the default repository
    pub fn updater(&self, scope: InstallScope, auto_run: bool) -> PluginUpdater {
        let mut options = UpdaterOptions::new();
        options.set_destination(self.destination(scope)).unwrap();
        options.set_repository_owner(REPO_KEY).unwrap();
        options.set_auto_run(auto_run);
        options.set_scope(scope);

        PluginUpdater::new(
            options,
            &self.config(),
            self.option_store(),
            self.plugin_host(),
        )
        .unwrap()
    }
}
