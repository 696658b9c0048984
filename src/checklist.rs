//! The processed-files checklist: durable record of fully converted documents.
//!
//! On disk it is a human-readable JSON array of absolute source paths,
//! indented with four spaces:
//!
//! ```json
//! [
//!     "/data/reports/2024/a.pdf",
//!     "/data/reports/2024/b.pdf"
//! ]
//! ```
//!
//! The whole file is rewritten after every completed document. The rewrite
//! goes to a temporary file in the same directory which is then renamed over
//! the checklist, so a crash mid-write leaves the previous version intact.
//! A missing file is an empty set.

use crate::config::ChecklistRecovery;
use crate::error::BatchError;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Set of document paths whose artifacts were all written successfully.
///
/// Iteration follows insertion order, which is also the on-disk order.
#[derive(Debug, Clone)]
pub struct ProcessedSet {
    path: PathBuf,
    entries: Vec<PathBuf>,
    index: HashSet<PathBuf>,
}

impl ProcessedSet {
    /// An empty set that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Load the checklist at `path`; a missing file yields an empty set.
    ///
    /// A file that is not a JSON array of paths is fatal under
    /// [`ChecklistRecovery::Fail`]; under [`ChecklistRecovery::Reset`] it is
    /// logged and replaced by an empty set on the next persist.
    pub fn load(path: impl Into<PathBuf>, recovery: ChecklistRecovery) -> Result<Self, BatchError> {
        let path = path.into();
        if !path.exists() {
            debug!("No checklist at {}, starting empty", path.display());
            return Ok(Self::empty(path));
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| BatchError::ChecklistRead {
            path: path.clone(),
            source: e,
        })?;

        match serde_json::from_str::<Vec<PathBuf>>(&raw) {
            Ok(entries) => {
                let mut set = Self::empty(path);
                for entry in entries {
                    set.insert(entry);
                }
                debug!(
                    "Loaded {} processed documents from {}",
                    set.len(),
                    set.path.display()
                );
                Ok(set)
            }
            Err(e) => match recovery {
                ChecklistRecovery::Fail => Err(BatchError::ChecklistCorrupt { path, source: e }),
                ChecklistRecovery::Reset => {
                    warn!(
                        "Checklist {} is corrupt ({}); starting from an empty set; \
                         previously converted documents will be processed again",
                        path.display(),
                        e
                    );
                    Ok(Self::empty(path))
                }
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, document: &Path) -> bool {
        self.index.contains(document)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Add a path in memory. Returns false if it was already present.
    pub fn insert(&mut self, document: PathBuf) -> bool {
        if self.index.contains(&document) {
            return false;
        }
        self.index.insert(document.clone());
        self.entries.push(document);
        true
    }

    /// Insert and immediately rewrite the checklist file.
    pub fn record(&mut self, document: PathBuf) -> Result<(), BatchError> {
        if self.insert(document) {
            self.persist()?;
        }
        Ok(())
    }

    /// Atomically rewrite the whole checklist file.
    pub fn persist(&self) -> Result<(), BatchError> {
        let write_err = |detail: String| BatchError::ChecklistWrite {
            path: self.path.clone(),
            detail,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut ser)
            .map_err(|e| write_err(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(&buf).map_err(|e| write_err(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_err(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| write_err(e.error.to_string()))?;

        debug!(
            "Checklist {} now holds {} documents",
            self.path.display(),
            self.entries.len()
        );
        Ok(())
    }
}
