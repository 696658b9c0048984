//! Artifact writing: page images and page texts at deterministic paths.
//!
//! ```text
//! {image_dir}/{base}-page{N}.png           flat, every page
//! {text_dir}/{base}/{base}-page{N}.txt     per document, pages ≥ min_text_chars
//! ```
//!
//! Paths depend only on the document's base name and the 1-indexed page
//! number, so a rerun after a crash overwrites exactly what the interrupted
//! run left behind. PNG is lossless, which keeps rendered text crisp for any
//! downstream OCR or vision model.

use crate::error::DocumentError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The two kinds of derived artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Text,
}

/// Content to persist for one page.
#[derive(Debug, Clone, Copy)]
pub enum ArtifactPayload<'a> {
    Image(&'a DynamicImage),
    Text(&'a str),
}

impl ArtifactPayload<'_> {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::Image(_) => ArtifactKind::Image,
            ArtifactPayload::Text(_) => ArtifactKind::Text,
        }
    }
}

/// Result of a single write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// The text was shorter than the inclusion threshold; nothing was written.
    Filtered,
}

/// Writes page artifacts under the configured output roots.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    image_dir: PathBuf,
    text_dir: PathBuf,
    min_text_chars: usize,
}

impl ArtifactWriter {
    pub fn new(
        image_dir: impl Into<PathBuf>,
        text_dir: impl Into<PathBuf>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            text_dir: text_dir.into(),
            min_text_chars,
        }
    }

    /// Deterministic artifact path for `(base_name, page_number)`.
    pub fn path_for(&self, kind: ArtifactKind, base_name: &str, page_number: usize) -> PathBuf {
        match kind {
            ArtifactKind::Image => self
                .image_dir
                .join(format!("{base_name}-page{page_number}.png")),
            ArtifactKind::Text => self
                .document_text_dir(base_name)
                .join(format!("{base_name}-page{page_number}.txt")),
        }
    }

    /// Per-document text directory.
    pub fn document_text_dir(&self, base_name: &str) -> PathBuf {
        self.text_dir.join(base_name)
    }

    /// True when `text` is long enough to be written.
    pub fn meets_text_threshold(&self, text: &str) -> bool {
        text.chars().count() >= self.min_text_chars
    }

    /// Persist one page artifact, overwriting any previous file at its path.
    ///
    /// Images are always written. Text shorter than the threshold is dropped
    /// silently and reported as [`WriteOutcome::Filtered`].
    pub fn write(
        &self,
        base_name: &str,
        page_number: usize,
        payload: ArtifactPayload<'_>,
    ) -> Result<WriteOutcome, DocumentError> {
        let path = self.path_for(payload.kind(), base_name, page_number);
        match payload {
            ArtifactPayload::Image(image) => {
                ensure_parent(&path)?;
                image
                    .save_with_format(&path, image::ImageFormat::Png)
                    .map_err(|e| DocumentError::WriteFailed {
                        path: path.clone(),
                        detail: e.to_string(),
                    })?;
            }
            ArtifactPayload::Text(text) => {
                if !self.meets_text_threshold(text) {
                    debug!(
                        "Skipping text for {base_name} page {page_number}: {} chars < {}",
                        text.chars().count(),
                        self.min_text_chars
                    );
                    return Ok(WriteOutcome::Filtered);
                }
                ensure_parent(&path)?;
                std::fs::write(&path, text).map_err(|e| DocumentError::WriteFailed {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            }
        }
        debug!("Wrote {}", path.display());
        Ok(WriteOutcome::Written(path))
    }
}

/// Create a directory and its parents; an existing directory is fine.
pub fn ensure_dir(dir: &Path) -> Result<(), DocumentError> {
    std::fs::create_dir_all(dir).map_err(|e| DocumentError::WriteFailed {
        path: dir.to_path_buf(),
        detail: e.to_string(),
    })
}

fn ensure_parent(path: &Path) -> Result<(), DocumentError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Base name used in artifact paths: the file name without its extension.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
