//! In-memory stand-ins for the host platform

use plugsync_update::{ManifestInfo, MemoryStore, OptionStore, PluginHost, UpdateError};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Option store that counts writes
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl OptionStore for CountingStore {
    fn get(&self, key: &str) -> plugsync_update::Result<Option<Value>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> plugsync_update::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

/// Host that recognises `.php` files with a `Plugin Name:` line
#[derive(Debug, Default)]
pub struct FakeHost {
    active: Mutex<Vec<String>>,
    activations: Mutex<Vec<String>>,
    fail_activation: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with plugins already active in the standard scope
    pub fn with_active(ids: &[&str]) -> Self {
        Self {
            active: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Host whose activation call always fails
    pub fn failing_activation() -> Self {
        Self {
            fail_activation: true,
            ..Self::default()
        }
    }

    /// Plugin ids passed to `activate`
    pub fn activations(&self) -> Vec<String> {
        self.activations.lock().unwrap().clone()
    }
}

fn header_value(content: &str, field: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim().trim_start_matches('*').trim();
        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|value| value.trim().to_string())
    })
}

impl PluginHost for FakeHost {
    fn parse_manifest(&self, file: &Path) -> Option<ManifestInfo> {
        if file.extension()?.to_str()? != "php" {
            return None;
        }
        let content = fs::read_to_string(file).ok()?;
        let name = header_value(&content, "Plugin Name")?;
        Some(ManifestInfo {
            name,
            version: header_value(&content, "Version").unwrap_or_default(),
            author: header_value(&content, "Author").unwrap_or_default(),
            ..ManifestInfo::default()
        })
    }

    fn activate(&self, plugin_id: &str) -> plugsync_update::Result<()> {
        if self.fail_activation {
            return Err(UpdateError::host(format!("cannot activate {}", plugin_id)));
        }
        self.activations.lock().unwrap().push(plugin_id.to_string());
        let mut active = self.active.lock().unwrap();
        if !active.iter().any(|id| id == plugin_id) {
            active.push(plugin_id.to_string());
        }
        Ok(())
    }

    fn active_plugins(&self) -> plugsync_update::Result<Vec<String>> {
        Ok(self.active.lock().unwrap().clone())
    }
}
