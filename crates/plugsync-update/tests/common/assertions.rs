//! Filesystem assertions

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Sorted names of the immediate entries of `dir` (empty when missing)
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Assert `dir` has no entries
pub fn assert_dir_empty(dir: &Path) {
    let entries = dir_entries(dir);
    assert!(
        entries.is_empty(),
        "expected {} to be empty, found {:?}",
        dir.display(),
        entries
    );
}

/// Every path under `root` with its size and modification time
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, (u64, SystemTime)> {
    let mut snapshot = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let metadata = entry.metadata().unwrap();
            snapshot.insert(
                path.clone(),
                (metadata.len(), metadata.modified().unwrap()),
            );
            if metadata.is_dir() {
                pending.push(path);
            }
        }
    }

    snapshot
}
