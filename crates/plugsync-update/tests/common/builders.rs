//! Builder for plugin zip archives

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

use super::constants::*;

/// Builds a zip the way an archive service packages a repository: one
/// top-level folder holding the tree
#[derive(Debug, Clone)]
pub struct PluginArchiveBuilder {
    folder: Option<String>,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    content: Vec<u8>,
    /// Name used verbatim instead of being placed under the folder
    raw: bool,
}

impl PluginArchiveBuilder {
    /// Empty archive rooted at the default `octo-widget-<sha>` folder
    pub fn new() -> Self {
        Self {
            folder: Some(archive_folder(SHA_V1)),
            entries: Vec::new(),
        }
    }

    /// Archive with the default plugin entry file and a readme
    pub fn standard() -> Self {
        Self::new()
            .file(PLUGIN_FILE, &plugin_header(PLUGIN_NAME, "1.0.0"))
            .file("readme.txt", "=== My Widget ===")
            .file("includes/helpers.php", "<?php // helpers")
    }

    /// Set the top-level folder name
    pub fn folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }

    /// Put entries at the archive root instead of inside a folder
    pub fn without_folder(mut self) -> Self {
        self.folder = None;
        self
    }

    /// Add a file relative to the top-level folder
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.entries.push(Entry {
            path: path.to_string(),
            content: content.as_bytes().to_vec(),
            raw: false,
        });
        self
    }

    /// Add an entry whose name is used verbatim (not prefixed by the folder)
    pub fn raw_entry(mut self, name: &str, content: &str) -> Self {
        self.entries.push(Entry {
            path: name.to_string(),
            content: content.as_bytes().to_vec(),
            raw: true,
        });
        self
    }

    /// Zip bytes
    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        if let Some(folder) = &self.folder {
            writer.add_directory(format!("{}/", folder), options).unwrap();
        }

        for entry in &self.entries {
            let name = match (&self.folder, entry.raw) {
                (Some(folder), false) => format!("{}/{}", folder, entry.path),
                _ => entry.path.clone(),
            };
            writer.start_file(name, options).unwrap();
            writer.write_all(&entry.content).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    /// Write the archive to `path`
    pub fn write_to(&self, path: &Path) {
        fs::write(path, self.build()).unwrap();
    }
}

impl Default for PluginArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
