//! Corpus discovery: enumerate candidate documents under a root directory.
//!
//! Discovery is a pure function of the file tree. It returns a fresh,
//! lexicographically sorted list on every call, so repeated runs in one
//! process see the same order and nothing accumulates between calls.
//!
//! Files without the accepted extension are ignored silently. Symbolic links
//! to directories are not followed, which keeps link cycles from recursing
//! forever. Subdirectories that cannot be listed are logged and skipped;
//! only an unusable root is fatal.

use crate::error::BatchError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Recursively list every file under `root` whose extension matches
/// `extension` case-insensitively.
///
/// Returned paths are absolute (relative roots are resolved against the
/// working directory) and sorted.
pub fn discover_documents(root: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::CorpusNotFound {
            path: root.to_path_buf(),
        });
    }
    let root = std::path::absolute(root).map_err(|e| BatchError::CorpusUnreadable {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut found = Vec::new();
    let entries = std::fs::read_dir(&root).map_err(|e| BatchError::CorpusUnreadable {
        path: root.clone(),
        source: e,
    })?;
    walk(entries, extension, &mut found);

    found.sort();
    debug!(
        "Discovered {} .{} documents under {}",
        found.len(),
        extension,
        root.display()
    );
    Ok(found)
}

fn walk(entries: std::fs::ReadDir, extension: &str, found: &mut Vec<PathBuf>) {
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() {
            match std::fs::read_dir(&path) {
                Ok(children) => walk(children, extension, found),
                Err(e) => warn!("Skipping unreadable directory {}: {}", path.display(), e),
            }
        } else if has_extension(&path, extension) {
            found.push(path);
        }
    }
}

/// Case-insensitive extension check (`extension` without the dot).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
