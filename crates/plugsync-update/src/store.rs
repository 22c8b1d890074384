//! Persisted install state
//!
//! The host owns a key/value options table. The updater keeps two entries
//! in it: the install-record mapping and the shared-scope active flags.
//! Both are keyed by `owner/name`.

use crate::error::{Result, UpdateError};
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Option key for the install-record mapping
pub const RECORDS_OPTION: &str = "plugsync_install_records";

/// Option key for the shared-scope active flags
pub const SHARED_ACTIVE_OPTION: &str = "plugsync_shared_active";

/// Hash stored for a repository that has been seen but never installed
pub const PLACEHOLDER_HASH: &str = "0";

/// Host-owned key/value store
pub trait OptionStore: Send + Sync {
    /// Read an option
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Create or overwrite an option
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Whether an option exists
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Replace an option with `apply(current)` as one step
    ///
    /// `apply` returns `None` to leave the option untouched. The default is a
    /// plain `get` then `set`; stores shared between processes override it
    /// to hold their lock across both.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Option<Value>>,
    ) -> Result<()> {
        if let Some(value) = apply(self.get(key)?)? {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Installed-version state of one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallRecord {
    /// Revision hash of the installed archive
    pub hash: String,

    /// Manifest file name inside the plugin folder
    #[serde(default)]
    pub file: String,

    /// Absolute path of the installed folder
    #[serde(default)]
    pub folder: String,

    /// When the record was last written by an install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InstallRecord {
    /// Record written the first time a repository is checked
    pub fn placeholder() -> Self {
        Self {
            hash: PLACEHOLDER_HASH.to_string(),
            file: String::new(),
            folder: String::new(),
            updated_at: None,
        }
    }

    /// Record for a completed install
    pub fn installed(hash: &str, file: &str, folder: &Path) -> Self {
        Self {
            hash: hash.to_string(),
            file: file.to_string(),
            folder: folder.to_string_lossy().into_owned(),
            updated_at: Some(Utc::now()),
        }
    }

    /// Whether the recorded folder is still on disk
    pub fn folder_exists(&self) -> bool {
        !self.folder.is_empty() && Path::new(&self.folder).is_dir()
    }

    /// Host plugin id, `folder-name/file`
    pub fn plugin_id(&self) -> Option<String> {
        if self.file.is_empty() {
            return None;
        }
        let folder_name = Path::new(&self.folder).file_name()?.to_str()?;
        Some(format!("{}/{}", folder_name, self.file))
    }
}

/// Typed view over the updater's entries in an [`OptionStore`]
#[derive(Clone)]
pub struct InstallState {
    store: Arc<dyn OptionStore>,
}

impl InstallState {
    /// Wrap an option store
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn OptionStore> {
        &self.store
    }

    /// All install records
    pub fn records(&self) -> Result<BTreeMap<String, InstallRecord>> {
        match self.store.get(RECORDS_OPTION)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Install record for one repository
    pub fn record(&self, key: &str) -> Result<Option<InstallRecord>> {
        Ok(self.records()?.remove(key))
    }

    /// Insert or overwrite a record
    pub fn upsert_record(&self, key: &str, record: InstallRecord) -> Result<()> {
        self.upsert_entry(RECORDS_OPTION, key, record)
    }

    /// Shared-scope active flags
    pub fn shared_active(&self) -> Result<BTreeMap<String, bool>> {
        match self.store.get(SHARED_ACTIVE_OPTION)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Set the shared-scope active flag for a repository
    pub fn set_shared_active(&self, key: &str, active: bool) -> Result<()> {
        self.upsert_entry(SHARED_ACTIVE_OPTION, key, active)
    }

    /// Plugin ids of repositories active in the shared scope
    pub fn shared_active_plugins(&self) -> Result<Vec<String>> {
        let records = self.records()?;
        let ids = self
            .shared_active()?
            .into_iter()
            .filter(|(_, active)| *active)
            .filter_map(|(key, _)| records.get(&key).and_then(InstallRecord::plugin_id))
            .collect();
        Ok(ids)
    }

    /// Set one entry of a mapping option; unchanged entries are not written
    fn upsert_entry<V>(&self, option: &str, key: &str, value: V) -> Result<()>
    where
        V: Serialize + DeserializeOwned + PartialEq + Clone,
    {
        self.store.update(option, &mut |current| {
            let mut entries: BTreeMap<String, V> = match current {
                Some(current) => serde_json::from_value(current)?,
                None => BTreeMap::new(),
            };
            if entries.get(key) == Some(&value) {
                debug!("{} entry for {} unchanged", option, key);
                return Ok(None);
            }
            entries.insert(key.to_string(), value.clone());
            Ok(Some(serde_json::to_value(entries)?))
        })
    }
}

/// In-process option store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| UpdateError::store("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| UpdateError::store("memory store lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Option<Value>>,
    ) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| UpdateError::store("memory store lock poisoned"))?;
        if let Some(value) = apply(values.get(key).cloned())? {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Option store backed by a JSON object file
///
/// Every write is a read-modify-write under an exclusive file lock, so
/// several processes may share one state file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let mut file = fs::File::open(&self.path)?;
        file.lock_shared()?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        parse_object(&self.path, &content)
    }

    /// Read-modify-write under the exclusive lock; `apply` returns whether
    /// anything changed
    fn modify(&self, apply: impl FnOnce(&mut Map<String, Value>) -> Result<bool>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)?;

        // Released when `file` is dropped
        file.lock_exclusive()?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let mut values = parse_object(&self.path, &content)?;
        if !apply(&mut values)? {
            return Ok(());
        }

        let serialized = serde_json::to_vec_pretty(&Value::Object(values))?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&serialized)?;
        file.sync_all()?;
        Ok(())
    }
}

fn parse_object(path: &Path, content: &str) -> Result<Map<String, Value>> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(content)? {
        Value::Object(map) => Ok(map),
        _ => Err(UpdateError::store(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
    }
}

impl OptionStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        debug!("Writing option {} to {}", key, self.path.display());
        self.modify(|values| {
            values.insert(key.to_string(), value);
            Ok(true)
        })
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Option<Value>>,
    ) -> Result<()> {
        self.modify(|values| match apply(values.get(key).cloned())? {
            Some(value) => {
                debug!("Writing option {} to {}", key, self.path.display());
                values.insert(key.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        })
    }
}
