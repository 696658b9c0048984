//! Resumable batch runner.
//!
//! A document moves `Pending → Processing → {Completed | Failed}`. Only a
//! completed document enters the checklist, and the checklist is rewritten
//! right after each completion, so an interrupted run resumes where it
//! stopped and a failed document is simply attempted again next time.
//!
//! Documents run on tokio's blocking pool (pdfium calls block). With
//! `concurrency > 1` several documents are in flight at once, but the
//! runner task stays the only writer of the checklist: completions are
//! consumed from a `buffer_unordered` stream one at a time.

use crate::checklist::ProcessedSet;
use crate::config::BatchConfig;
use crate::error::{BatchError, DocumentError};
use crate::output::{BatchReport, DocumentSummary, FailedDocument};
use crate::pipeline::artifacts::{self, ArtifactPayload, ArtifactWriter, WriteOutcome};
use crate::pipeline::discover::discover_documents;
use crate::pipeline::engine::DocumentEngine;
use crate::pipeline::extract::{ExtractOptions, PageExtractor};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a run would do, computed from the corpus and the checklist.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    /// Every accepted document under the corpus root, sorted.
    pub discovered: Vec<PathBuf>,
    /// Documents not yet in the checklist, in discovery order.
    pub pending: Vec<PathBuf>,
    /// Number of discovered documents the checklist already holds.
    pub already_processed: usize,
}

/// Drives one pass over a corpus.
pub struct BatchRunner {
    engine: Arc<dyn DocumentEngine>,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(engine: Arc<dyn DocumentEngine>, config: BatchConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Load the checklist and enumerate the corpus without converting anything.
    pub fn plan(&self) -> Result<BatchPlan, BatchError> {
        let checklist =
            ProcessedSet::load(&self.config.checklist_path, self.config.checklist_recovery)?;
        self.plan_with(&checklist)
    }

    fn plan_with(&self, checklist: &ProcessedSet) -> Result<BatchPlan, BatchError> {
        let discovered = discover_documents(&self.config.corpus_root, &self.config.extension)?;
        let pending: Vec<PathBuf> = discovered
            .iter()
            .filter(|p| !checklist.contains(p))
            .cloned()
            .collect();
        let already_processed = discovered.len() - pending.len();
        warn_on_colliding_names(&pending);
        Ok(BatchPlan {
            discovered,
            pending,
            already_processed,
        })
    }

    /// Process every pending document.
    pub async fn run(&self) -> Result<BatchReport, BatchError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Process pending documents until done or until `shutdown` resolves.
    ///
    /// After shutdown no further completion is recorded; documents still in
    /// flight stay pending. Returns `Err` only for fatal conditions: an
    /// unusable corpus root, checklist, or output root. Per-document
    /// failures land in [`BatchReport::failed`].
    pub async fn run_until(
        &self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<BatchReport, BatchError> {
        let start = Instant::now();

        // ── Step 1: Checklist + discovery ────────────────────────────────────
        let mut checklist =
            ProcessedSet::load(&self.config.checklist_path, self.config.checklist_recovery)?;
        let plan = self.plan_with(&checklist)?;
        info!(
            "Found {} documents under {} ({} already processed, {} pending)",
            plan.discovered.len(),
            self.config.corpus_root.display(),
            plan.already_processed,
            plan.pending.len()
        );

        // ── Step 2: Output roots ─────────────────────────────────────────────
        self.prepare_output_dirs()?;

        let mut report = BatchReport {
            discovered: plan.discovered.len(),
            already_processed: plan.already_processed,
            ..BatchReport::default()
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(plan.pending.len(), plan.already_processed);
        }

        // ── Step 3: Process, recording each completion serially ──────────────
        let total = plan.pending.len();
        let mut outcomes = stream::iter(plan.pending.into_iter().enumerate().map(
            |(i, path)| {
                let engine = Arc::clone(&self.engine);
                let config = self.config.clone();
                async move {
                    info!("Processing {}", path.display());
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_document_start(&path, i + 1, total);
                    }
                    let outcome = process_isolated(engine, config, path.clone()).await;
                    (path, outcome)
                }
            },
        ))
        .buffer_unordered(self.config.concurrency);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(
                        "Shutdown requested; {} pending documents left for the next run",
                        total - report.completed.len() - report.failed.len()
                    );
                    report.cancelled = true;
                    break;
                }
                next = outcomes.next() => match next {
                    None => break,
                    Some((path, Ok(summary))) => {
                        checklist.record(path)?;
                        info!(
                            "Completed {} ({} pages, {} images, {} texts) in {}ms",
                            summary.path.display(),
                            summary.page_count,
                            summary.images_written,
                            summary.texts_written,
                            summary.duration_ms
                        );
                        if let Some(ref cb) = self.config.progress_callback {
                            cb.on_document_complete(&summary);
                        }
                        report.completed.push(summary);
                    }
                    Some((path, Err(error))) => {
                        warn!("Failed to process {}: {}", path.display(), error);
                        if let Some(ref cb) = self.config.progress_callback {
                            cb.on_document_error(&path, &error);
                        }
                        report.failed.push(FailedDocument { path, error });
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch finished: {} completed, {} failed, {} skipped in {}ms",
            report.completed.len(),
            report.failed.len(),
            report.already_processed,
            report.duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(&report);
        }
        Ok(report)
    }

    fn prepare_output_dirs(&self) -> Result<(), BatchError> {
        let mut dirs = Vec::new();
        if self.config.artifacts.images() {
            dirs.push(&self.config.image_dir);
        }
        if self.config.artifacts.text() {
            dirs.push(&self.config.text_dir);
        }
        for dir in dirs {
            std::fs::create_dir_all(dir).map_err(|e| BatchError::OutputDirFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Run one document on the blocking pool, applying the configured time limit.
///
/// A timed-out worker thread cannot be interrupted; it finishes in the
/// background but its result is discarded.
async fn process_isolated(
    engine: Arc<dyn DocumentEngine>,
    config: BatchConfig,
    path: PathBuf,
) -> Result<DocumentSummary, DocumentError> {
    let limit = config.document_timeout;
    let task =
        tokio::task::spawn_blocking(move || process_document(engine.as_ref(), &path, &config));

    let joined = match limit {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| DocumentError::Timeout {
                limit_ms: limit.as_millis() as u64,
            })?,
        None => task.await,
    };

    joined.map_err(|e| DocumentError::Panicked {
        detail: e.to_string(),
    })?
}

/// Convert one document synchronously: open, write images, extract and
/// write text.
///
/// The document handle is dropped on every exit path, including errors
/// part-way through its pages. Artifacts written before an error stay on
/// disk and are overwritten on retry.
pub fn process_document(
    engine: &dyn DocumentEngine,
    path: &Path,
    config: &BatchConfig,
) -> Result<DocumentSummary, DocumentError> {
    let start = Instant::now();
    let document = engine.open(path)?;
    let page_count = document.page_count();
    let base = artifacts::base_name(path);
    let writer = ArtifactWriter::new(&config.image_dir, &config.text_dir, config.min_text_chars);
    debug!("{} has {} pages", path.display(), page_count);

    let mut summary = DocumentSummary {
        path: path.to_path_buf(),
        page_count,
        images_written: 0,
        texts_written: 0,
        texts_filtered: 0,
        duration_ms: 0,
    };

    if config.artifacts.images() {
        for index in 0..page_count {
            let image = document.render_page(index, config.image_scale)?;
            writer.write(&base, index + 1, ArtifactPayload::Image(&image))?;
            summary.images_written += 1;
        }
    }

    if config.artifacts.text() {
        let pages = PageExtractor::new(ExtractOptions::from(config)).extract(document.as_ref())?;
        artifacts::ensure_dir(&writer.document_text_dir(&base))?;
        for (index, text) in pages.iter().enumerate() {
            match writer.write(&base, index + 1, ArtifactPayload::Text(text))? {
                WriteOutcome::Written(_) => summary.texts_written += 1,
                WriteOutcome::Filtered => summary.texts_filtered += 1,
            }
        }
    }

    summary.duration_ms = start.elapsed().as_millis() as u64;
    Ok(summary)
}

/// Artifact paths are keyed on the file stem only, so two pending documents
/// with the same stem in different directories overwrite each other.
fn warn_on_colliding_names(pending: &[PathBuf]) {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in pending {
        if let Some(first) = seen.insert(artifacts::base_name(path), path) {
            warn!(
                "{} and {} share an artifact base name; the later one's artifacts win",
                first.display(),
                path.display()
            );
        }
    }
}
