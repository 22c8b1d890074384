//! Install bookkeeping and host activation

use plugsync_core::types::InstallScope;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::host::PluginHost;
use crate::repository::RepositoryRef;
use crate::store::{InstallRecord, InstallState};

/// Persists install records and triggers activation
pub struct StateRecorder {
    host: Arc<dyn PluginHost>,
    state: InstallState,
}

impl StateRecorder {
    /// Create a recorder
    pub fn new(host: Arc<dyn PluginHost>, state: InstallState) -> Self {
        Self { host, state }
    }

    /// Record a completed install
    ///
    /// Shared-scope installs are flagged active and need no activation call;
    /// the host loads their linker file on its own. Standard-scope installs
    /// are activated through the host.
    pub fn record_install(
        &self,
        repo: &RepositoryRef,
        revision: &str,
        manifest_file: &str,
        folder: &Path,
        scope: InstallScope,
    ) -> Result<()> {
        let key = repo.key();
        let record = InstallRecord::installed(revision, manifest_file, folder);
        let plugin_id = record.plugin_id();
        self.state.upsert_record(&key, record)?;
        debug!("Recorded {} at {}", key, revision);

        match scope {
            InstallScope::Shared => {
                self.state.set_shared_active(&key, true)?;
            }
            InstallScope::Standard => {
                if let Some(plugin_id) = plugin_id {
                    info!("Activating {}", plugin_id);
                    self.host.activate(&plugin_id)?;
                }
            }
        }

        Ok(())
    }
}
