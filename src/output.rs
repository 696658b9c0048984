//! Result types returned by a batch run.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a successfully converted document produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Absolute source path, as recorded in the checklist.
    pub path: PathBuf,
    pub page_count: usize,
    pub images_written: usize,
    pub texts_written: usize,
    /// Pages whose text fell below the inclusion threshold.
    pub texts_filtered: usize,
    pub duration_ms: u64,
}

/// A document that failed this run and stays pending for the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDocument {
    pub path: PathBuf,
    pub error: DocumentError,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Documents with the accepted extension found under the corpus root.
    pub discovered: usize,
    /// Documents skipped because the checklist already held them.
    pub already_processed: usize,
    pub completed: Vec<DocumentSummary>,
    pub failed: Vec<FailedDocument>,
    /// True when the run stopped early on a shutdown request.
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Documents this run was asked to convert.
    pub fn pending(&self) -> usize {
        self.discovered - self.already_processed
    }

    /// Pending documents that neither completed nor failed (cancelled runs only).
    pub fn not_attempted(&self) -> usize {
        self.pending()
            .saturating_sub(self.completed.len() + self.failed.len())
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}
