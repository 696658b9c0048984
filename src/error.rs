//! Error types for the edgequake-pdfbatch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`]: **Fatal**: the run cannot proceed at all (corpus root
//!   missing, checklist unreadable or unwritable, pdfium not available).
//!   Returned as `Err(BatchError)` from [`crate::batch::BatchRunner::run`].
//!
//! * [`DocumentError`]: **Non-fatal**: a single document failed (corrupt
//!   file, render glitch, full disk) but the rest of the corpus is fine. It is
//!   recorded in [`crate::output::BatchReport`] and the document stays pending
//!   so the next run retries it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfbatch library.
///
/// Document-level failures use [`DocumentError`] and never abort a run.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Corpus errors ─────────────────────────────────────────────────────
    /// The corpus root does not exist or is not a directory.
    #[error("Corpus root not found: '{path}'\nCheck the path exists and is a directory.")]
    CorpusNotFound { path: PathBuf },

    /// The corpus root exists but could not be listed.
    #[error("Failed to read corpus root '{path}': {source}")]
    CorpusUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Checklist errors ──────────────────────────────────────────────────
    /// The processed-files checklist exists but could not be read.
    #[error("Failed to read checklist '{path}': {source}")]
    ChecklistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The checklist is not a JSON array of paths.
    #[error(
        "Checklist '{path}' is corrupt: {source}\n\
Fix or delete the file, or rerun with --recover-checklist to start from an empty set."
    )]
    ChecklistCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The checklist could not be written after a document completed.
    #[error("Failed to write checklist '{path}': {detail}")]
    ChecklistWrite { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// An output root directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide so the dynamic loader finds it.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n"
    )]
    PdfiumBindingFailed(String),
}

/// A non-fatal error for a single document.
///
/// Any of these leaves the document out of the checklist, so it is attempted
/// again on the next run.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The document could not be opened or parsed.
    #[error("Failed to open '{path}': {detail}")]
    OpenFailed { path: PathBuf, detail: String },

    /// The document is encrypted and no password was configured.
    #[error("'{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    /// A password was configured but it is wrong for this document.
    #[error("Wrong password for '{path}'")]
    WrongPassword { path: PathBuf },

    /// A page could not be loaded from an opened document.
    #[error("Page {page}: failed to load: {detail}")]
    PageLoadFailed { page: usize, detail: String },

    /// Text could not be retrieved from a page.
    #[error("Page {page}: text extraction failed: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// A page could not be rasterised.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// An artifact or its directory could not be written.
    #[error("Failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// Processing exceeded the per-document time limit.
    #[error("Document processing timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    /// The worker processing this document panicked.
    #[error("Document worker panicked: {detail}")]
    Panicked { detail: String },
}
