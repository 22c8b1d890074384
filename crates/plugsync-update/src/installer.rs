//! Archive installation into a plugins directory
//!
//! Steps, each undoing its own filesystem changes on failure:
//! 1. Unpack the zip into the destination
//! 2. Locate the folder the archive service produced (`owner-name*`)
//! 3. Find the manifest-bearing file among its immediate files
//! 4. Derive the canonical folder name from the manifest
//! 5. Refuse plugins already active under the other scope
//! 6. Move the folder to its canonical name, replacing an older install
//! 7. Generate the top-level linker file for shared-scope installs

use glob::{MatchOptions, Pattern};
use plugsync_core::types::InstallScope;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::download::DownloadResult;
use crate::error::{Result, UpdateError};
use crate::host::{ManifestInfo, PluginHost};
use crate::repository::RepositoryRef;
use crate::store::InstallState;

/// Extension of generated linker files
pub const LINKER_EXT: &str = "php";

/// Result of a successful install
#[derive(Debug, Clone)]
pub struct InstalledPlugin {
    /// Canonical folder name
    pub slug: String,

    /// Installed folder
    pub folder: PathBuf,

    /// Manifest-bearing file name inside `folder`
    pub manifest_file: String,

    /// Parsed manifest
    pub manifest: ManifestInfo,

    /// Scope the plugin was installed into
    pub scope: InstallScope,

    /// Generated linker file (shared scope only)
    pub linker: Option<PathBuf>,
}

impl InstalledPlugin {
    /// Host plugin id, `slug/file`
    pub fn plugin_id(&self) -> String {
        format!("{}/{}", self.slug, self.manifest_file)
    }
}

type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// Unpacks archives and reconciles the plugins directory
pub struct ArchiveInstaller {
    host: Arc<dyn PluginHost>,
    state: InstallState,
    rename: RenameFn,
}

impl ArchiveInstaller {
    /// Create an installer
    pub fn new(host: Arc<dyn PluginHost>, state: InstallState) -> Self {
        Self {
            host,
            state,
            rename: rename_dir,
        }
    }

    #[cfg(test)]
    fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    /// Install a downloaded archive
    pub fn install(
        &self,
        download: &DownloadResult,
        repo: &RepositoryRef,
        destination: &Path,
        scope: InstallScope,
    ) -> Result<InstalledPlugin> {
        self.install_archive(&download.file_path, repo, destination, scope)
    }

    /// Install a zip archive from disk
    pub fn install_archive(
        &self,
        archive: &Path,
        repo: &RepositoryRef,
        destination: &Path,
        scope: InstallScope,
    ) -> Result<InstalledPlugin> {
        fs::create_dir_all(destination).map_err(|e| {
            UpdateError::extraction(format!(
                "cannot create destination {}: {}",
                destination.display(),
                e
            ))
        })?;

        debug!("Extracting {} into {}", archive.display(), destination.display());
        let top_levels = extract_zip(archive, destination)?;
        let extracted = find_extracted_folder(destination, repo, &top_levels)?;
        debug!("Extracted folder: {}", extracted.display());

        let (manifest_file, manifest) = match self.find_manifest(&extracted) {
            Some(found) => found,
            None => {
                error!("No plugin manifest in {}", extracted.display());
                remove_path_logged(&extracted);
                return Err(UpdateError::NoManifestFound { folder: extracted });
            }
        };

        let slug = match sanitize_slug(&manifest.name) {
            slug if !slug.is_empty() => slug,
            _ => repo.folder_prefix().to_lowercase(),
        };
        let plugin_id = format!("{}/{}", slug, manifest_file);

        if let Err(e) = self.ensure_not_duplicate(&plugin_id, scope) {
            error!("{}", e);
            remove_path_logged(&extracted);
            return Err(e);
        }

        let folder = self.move_to_canonical(&extracted, destination, &slug)?;

        let linker = match scope {
            InstallScope::Shared => {
                Some(write_linker(destination, &slug, &manifest_file, &manifest)?)
            }
            InstallScope::Standard => None,
        };

        info!(
            "Installed {} {} into {}",
            manifest.name,
            manifest.version,
            folder.display()
        );

        Ok(InstalledPlugin {
            slug,
            folder,
            manifest_file,
            manifest,
            scope,
            linker,
        })
    }

    /// First immediate file (by name) the host recognises as a manifest
    fn find_manifest(&self, folder: &Path) -> Option<(String, ManifestInfo)> {
        let mut files: Vec<PathBuf> = fs::read_dir(folder)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        files.into_iter().find_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            self.host.parse_manifest(&path).map(|manifest| (name, manifest))
        })
    }

    fn ensure_not_duplicate(&self, plugin_id: &str, scope: InstallScope) -> Result<()> {
        let active_elsewhere = match scope {
            InstallScope::Shared => self.host.active_plugins()?,
            InstallScope::Standard => self.state.shared_active_plugins()?,
        };

        if active_elsewhere.iter().any(|id| id == plugin_id) {
            return Err(UpdateError::DuplicateInstallation {
                plugin: plugin_id.to_string(),
                scope: scope.other().to_string(),
            });
        }
        Ok(())
    }

    fn move_to_canonical(
        &self,
        extracted: &Path,
        destination: &Path,
        slug: &str,
    ) -> Result<PathBuf> {
        let already_canonical = extracted
            .file_name()
            .map(|name| name == slug)
            .unwrap_or(false);
        if already_canonical {
            return Ok(extracted.to_path_buf());
        }

        let target = destination.join(slug);
        if target.exists() {
            debug!("Replacing existing install at {}", target.display());
            remove_path_logged(&target);
        }

        if let Err(source) = (self.rename)(extracted, &target) {
            error!(
                "Failed to rename {} to {}: {}",
                extracted.display(),
                target.display(),
                source
            );
            remove_path_logged(extracted);
            return Err(UpdateError::RenameFailure {
                from: extracted.to_path_buf(),
                to: target,
                source,
            });
        }

        Ok(target)
    }
}

fn rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

/// Unpack `archive` into `destination`, returning its top-level entry names
///
/// Entries that would land outside `destination` are skipped. On failure the
/// top-level entries created by this extraction are removed again.
fn extract_zip(archive: &Path, destination: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(archive).map_err(|e| {
        UpdateError::extraction(format!("cannot open {}: {}", archive.display(), e))
    })?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| UpdateError::extraction(format!("not a zip archive: {}", e)))?;

    let mut top_levels = BTreeSet::new();
    for i in 0..zip.len() {
        let entry = zip
            .by_index(i)
            .map_err(|e| UpdateError::extraction(format!("unreadable entry {}: {}", i, e)))?;
        let first = entry.enclosed_name().and_then(|p| p.components().next());
        if let Some(Component::Normal(first)) = first {
            top_levels.insert(first.to_string_lossy().into_owned());
        }
    }

    if top_levels.is_empty() {
        return Err(UpdateError::extraction("archive contains no entries"));
    }

    let created: Vec<PathBuf> = top_levels
        .iter()
        .map(|name| destination.join(name))
        .filter(|path| !path.exists())
        .collect();

    if let Err(e) = unpack(&mut zip, destination) {
        for path in &created {
            remove_path_logged(path);
        }
        return Err(e);
    }

    Ok(top_levels)
}

fn unpack(zip: &mut ZipArchive<File>, destination: &Path) -> Result<()> {
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| UpdateError::extraction(format!("unreadable entry {}: {}", i, e)))?;

        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                warn!("Skipping archive entry with unsafe path: {}", entry.name());
                continue;
            }
        };
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| {
                UpdateError::extraction(format!("cannot create {}: {}", out_path.display(), e))
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                UpdateError::extraction(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut out = File::create(&out_path).map_err(|e| {
            UpdateError::extraction(format!("cannot write {}: {}", out_path.display(), e))
        })?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            UpdateError::extraction(format!("cannot write {}: {}", out_path.display(), e))
        })?;
    }
    Ok(())
}

/// Locate the folder the archive unpacked to
///
/// Archive services name it `owner-name-<revision>`. A glob match that is one
/// of this archive's top-level folders wins; an archive with a single
/// top-level folder is accepted when the naming scheme does not match.
fn find_extracted_folder(
    destination: &Path,
    repo: &RepositoryRef,
    top_levels: &BTreeSet<String>,
) -> Result<PathBuf> {
    let pattern = format!(
        "{}*",
        Pattern::escape(&destination.join(repo.folder_prefix()).to_string_lossy())
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut matches: Vec<PathBuf> = glob::glob_with(&pattern, options)
        .map_err(|e| {
            UpdateError::extraction(format!("invalid folder pattern {}: {}", pattern, e))
        })?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .collect();
    matches.sort();

    let from_archive = matches.iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| top_levels.contains(name))
            .unwrap_or(false)
    });
    if let Some(found) = from_archive {
        return Ok(found.clone());
    }

    let top_dirs: Vec<PathBuf> = top_levels
        .iter()
        .map(|name| destination.join(name))
        .filter(|path| path.is_dir())
        .collect();
    if let [single] = top_dirs.as_slice() {
        warn!(
            "Archive folder {} does not match {}*; using it anyway",
            single.display(),
            repo.folder_prefix()
        );
        return Ok(single.clone());
    }

    Err(UpdateError::extraction(format!(
        "could not locate extracted folder matching {}*",
        repo.folder_prefix()
    )))
}

/// Lowercase, filesystem-safe folder name
pub fn sanitize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        let mapped = if c.is_whitespace() {
            Some('-')
        } else if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
            Some(c)
        } else {
            None
        };
        if let Some(c) = mapped {
            if c == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(c);
        }
    }
    slug.trim_matches(|c| c == '-' || c == '.').to_string()
}

/// Write `destination/slug.php` requiring the real entry file
fn write_linker(
    destination: &Path,
    slug: &str,
    manifest_file: &str,
    manifest: &ManifestInfo,
) -> Result<PathBuf> {
    let path = destination.join(format!("{}.{}", slug, LINKER_EXT));
    let content = linker_stub(slug, manifest_file, manifest);
    fs::write(&path, content).map_err(|source| UpdateError::WriteFailure {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote linker file {}", path.display());
    Ok(path)
}

/// Linker file contents: the manifest header plus one include
pub fn linker_stub(slug: &str, manifest_file: &str, manifest: &ManifestInfo) -> String {
    let header = |value: &str| value.replace("*/", "* /").replace(['\r', '\n'], " ");
    let include = format!("{}/{}", slug, manifest_file)
        .replace('\\', "\\\\")
        .replace('\'', "\\'");

    format!(
        "<?php\n\
         /**\n \
         * Plugin Name: {}\n \
         * Plugin URI: {}\n \
         * Description: {}\n \
         * Version: {}\n \
         * Author: {}\n \
         * Author URI: {}\n \
         */\n\
         \n\
         require_once __DIR__ . '/{}';\n",
        header(&manifest.name),
        header(&manifest.uri),
        header(&manifest.description),
        header(&manifest.version),
        header(&manifest.author),
        header(&manifest.author_uri),
        include
    )
}

/// Remove a file or directory tree, logging instead of failing
pub(crate) fn remove_path_logged(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    struct HeaderHost;

    impl PluginHost for HeaderHost {
        fn parse_manifest(&self, file: &Path) -> Option<ManifestInfo> {
            let content = fs::read_to_string(file).ok()?;
            let name = content
                .lines()
                .find_map(|line| line.split_once("Plugin Name:"))
                .map(|(_, name)| name.trim().to_string())?;
            Some(ManifestInfo {
                name,
                ..ManifestInfo::default()
            })
        }

        fn activate(&self, _plugin_id: &str) -> Result<()> {
            Ok(())
        }

        fn active_plugins(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn write_plugin_zip(path: &Path) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        zip.start_file("octo-widget-abc123/widget.php", FileOptions::default())
            .unwrap();
        zip.write_all(b"<?php\n/*\n * Plugin Name: My Widget\n */\n")
            .unwrap();
        zip.finish().unwrap();
    }

    fn failing_rename(_from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "rename refused"))
    }

    #[test]
    fn test_rename_failure_removes_extracted_folder() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("archive.zip");
        let destination = temp.path().join("plugins");
        write_plugin_zip(&archive);

        let state = InstallState::new(Arc::new(MemoryStore::new()));
        let installer =
            ArchiveInstaller::new(Arc::new(HeaderHost), state).with_rename(failing_rename);
        let repo = RepositoryRef::new("octo", "widget").unwrap();

        let result =
            installer.install_archive(&archive, &repo, &destination, InstallScope::Standard);

        match result {
            Err(UpdateError::RenameFailure { from, to, .. }) => {
                assert_eq!(from, destination.join("octo-widget-abc123"));
                assert_eq!(to, destination.join("my-widget"));
            }
            other => panic!("expected RenameFailure, got {:?}", other),
        }
        assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
    }

    #[test]
    fn test_default_rename_moves_folder() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("archive.zip");
        let destination = temp.path().join("plugins");
        write_plugin_zip(&archive);

        let state = InstallState::new(Arc::new(MemoryStore::new()));
        let installer = ArchiveInstaller::new(Arc::new(HeaderHost), state);
        let repo = RepositoryRef::new("octo", "widget").unwrap();

        let plugin = installer
            .install_archive(&archive, &repo, &destination, InstallScope::Standard)
            .unwrap();

        assert_eq!(plugin.folder, destination.join("my-widget"));
        assert!(plugin.folder.join("widget.php").is_file());
        assert!(!destination.join("octo-widget-abc123").exists());
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("My Widget"), "my-widget");
        assert_eq!(sanitize_slug("  Widget   Pro  v2 "), "widget-pro-v2");
        assert_eq!(sanitize_slug("Ünïcode & Friends!"), "ünïcode-friends");
        assert_eq!(sanitize_slug("Виджет Про"), "виджет-про");
        assert_eq!(sanitize_slug("..hidden.."), "hidden");
        assert_eq!(sanitize_slug("a_b.c"), "a_b.c");
        assert_eq!(sanitize_slug("!!!"), "");
    }

    #[test]
    fn test_linker_stub() {
        let manifest = ManifestInfo {
            name: "My Widget".to_string(),
            uri: "https://example.com".to_string(),
            description: "Does */ things".to_string(),
            version: "1.2.0".to_string(),
            author: "Octo".to_string(),
            author_uri: String::new(),
        };
        let stub = linker_stub("my-widget", "widget.php", &manifest);

        assert!(stub.starts_with("<?php\n/**\n * Plugin Name: My Widget\n"));
        assert!(stub.contains(" * Version: 1.2.0\n"));
        assert!(stub.contains("Does * / things"));
        assert!(stub.ends_with("require_once __DIR__ . '/my-widget/widget.php';\n"));
        assert_eq!(stub.matches("*/").count(), 1);
    }

    #[test]
    fn test_remove_path_logged_missing_is_quiet() {
        remove_path_logged(Path::new("/nonexistent/plugsync/path"));
    }
}
