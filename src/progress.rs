//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the runner works through the corpus.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfbatch::{BatchConfig, BatchProgressCallback, DocumentSummary};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, summary: &DocumentSummary) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} done ({} pages)", summary.path.display(), summary.page_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder("/data/reports")
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::DocumentError;
use crate::output::{BatchReport, DocumentSummary};
use std::path::Path;
use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// All events are delivered from the runner task. With `concurrency > 1`,
/// several `on_document_start` calls may precede the first completion, and
/// completions arrive in finishing order rather than discovery order.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before any document is opened.
    ///
    /// # Arguments
    /// * `pending`:           documents this run will attempt
    /// * `already_processed`: documents skipped because the checklist holds them
    fn on_batch_start(&self, pending: usize, already_processed: usize) {
        let _ = (pending, already_processed);
    }

    /// Called when a worker starts on a document.
    ///
    /// # Arguments
    /// * `path`:  source document
    /// * `index`: 1-indexed position in the pending list
    /// * `total`: number of pending documents
    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let _ = (path, index, total);
    }

    /// Called after a document's artifacts are written and it is recorded.
    fn on_document_complete(&self, summary: &DocumentSummary) {
        let _ = summary;
    }

    /// Called when a document fails; it stays pending for the next run.
    fn on_document_error(&self, path: &Path, error: &DocumentError) {
        let _ = (path, error);
    }

    /// Called once at the end of the run, including cancelled runs.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
