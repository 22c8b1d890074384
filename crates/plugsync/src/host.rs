//! Standalone plugin host for running outside a host platform
//!
//! Manifests are read from the header comment of `.php` entry files. The
//! set of active plugin ids is kept in the option store next to the
//! updater's own state.

use plugsync_update::{ManifestInfo, OptionStore, PluginHost, Result};
use regex::Regex;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Option key holding the active plugin ids
pub const ACTIVE_PLUGINS_OPTION: &str = "active_plugins";

/// Only the start of a file is searched for the header
const HEADER_SCAN_BYTES: u64 = 8 * 1024;

/// File extension of plugin entry files
const ENTRY_EXT: &str = "php";

static PLUGIN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Plugin Name"));
static PLUGIN_URI_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Plugin URI"));
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Description"));
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Version"));
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Author"));
static AUTHOR_URI_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Author URI"));

pub struct StandaloneHost {
    store: Arc<dyn OptionStore>,
}

impl StandaloneHost {
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self { store }
    }
}

impl PluginHost for StandaloneHost {
    fn parse_manifest(&self, file: &Path) -> Option<ManifestInfo> {
        if file.extension()?.to_str()? != ENTRY_EXT {
            return None;
        }

        let mut head = Vec::new();
        File::open(file)
            .ok()?
            .take(HEADER_SCAN_BYTES)
            .read_to_end(&mut head)
            .ok()?;
        let text = String::from_utf8_lossy(&head);

        let name = header_field(&text, &PLUGIN_NAME_RE).filter(|name| !name.is_empty())?;
        debug!("Found plugin header '{}' in {}", name, file.display());

        let field = |re: &Regex| header_field(&text, re).unwrap_or_default();
        Some(ManifestInfo {
            name,
            uri: field(&PLUGIN_URI_RE),
            description: field(&DESCRIPTION_RE),
            version: field(&VERSION_RE),
            author: field(&AUTHOR_RE),
            author_uri: field(&AUTHOR_URI_RE),
        })
    }

    fn activate(&self, plugin_id: &str) -> Result<()> {
        self.store.update(ACTIVE_PLUGINS_OPTION, &mut |current| {
            let mut active = active_ids(current)?;
            if active.iter().any(|id| id == plugin_id) {
                return Ok(None);
            }
            active.push(plugin_id.to_string());
            active.sort();
            Ok(Some(serde_json::to_value(active)?))
        })
    }

    fn active_plugins(&self) -> Result<Vec<String>> {
        active_ids(self.store.get(ACTIVE_PLUGINS_OPTION)?)
    }
}

fn active_ids(value: Option<Value>) -> Result<Vec<String>> {
    match value {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Matches a `Key: value` line in a header comment
fn header_regex(key: &str) -> Regex {
    let pattern = format!(r"(?mi)^(?:[ \t]*<\?php)?[ \t/*#@]*{}:(.*)$", regex::escape(key));
    Regex::new(&pattern).expect("header regex is valid")
}

/// Value of the header line matched by `re`
fn header_field(text: &str, re: &Regex) -> Option<String> {
    let raw = re.captures(text)?.get(1)?.as_str();

    // Strip a trailing comment terminator on the same line
    let value = match raw.find("*/") {
        Some(end) => &raw[..end],
        None => raw,
    };
    Some(value.trim().to_string())
}
