//! # edgequake-pdfbatch
//!
//! Resumable conversion of a directory tree of PDF documents into per-page
//! artifacts: a PNG image of every page and a plain-text file for every page
//! with enough text to be worth keeping.
//!
//! ## Why this crate?
//!
//! Large corpora (annual reports, filings, research papers) take hours to
//! convert and some files inevitably fail to parse. The runner records every
//! fully converted document in a JSON checklist as soon as it finishes, so a
//! crash or Ctrl-C loses at most the documents in flight, and a broken file
//! never stops the rest of the corpus.
//!
//! ## Pipeline Overview
//!
//! ```text
//! corpus root
//!  │
//!  ├─ 1. Discover  recursive walk, extension filter, sorted
//!  ├─ 2. Skip      documents already in the checklist
//!  ├─ 3. Open      pdfium (blocking, spawn_blocking, per-document timeout)
//!  ├─ 4. Render    every page → {image_dir}/{base}-page{N}.png
//!  ├─ 5. Extract   every page → cleaned text (plain or markdown headers)
//!  ├─ 6. Write     text ≥ 500 chars → {text_dir}/{base}/{base}-page{N}.txt
//!  └─ 7. Record    append to checklist, atomic rewrite
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfbatch::{BatchConfig, BatchRunner, PdfiumEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = PdfiumEngine::bind(None, None)?;
//!     let config = BatchConfig::builder("/data/reports").build()?;
//!     let report = BatchRunner::new(Arc::new(engine), config).run().await?;
//!     eprintln!(
//!         "{} converted, {} failed, {} already done",
//!         report.completed.len(),
//!         report.failed.len(),
//!         report.already_processed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfbatch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfbatch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod checklist;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_document, BatchPlan, BatchRunner};
pub use checklist::ProcessedSet;
pub use config::{
    ArtifactKinds, BatchConfig, BatchConfigBuilder, ChecklistRecovery, TextMode,
    DEFAULT_CHECKLIST, DEFAULT_MIN_TEXT_CHARS,
};
pub use error::{BatchError, DocumentError};
pub use output::{BatchReport, DocumentSummary, FailedDocument};
pub use pipeline::artifacts::ArtifactWriter;
pub use pipeline::discover::discover_documents;
pub use pipeline::engine::{DocumentEngine, EngineDocument, PdfiumEngine, TextSpan};
pub use pipeline::extract::{ExtractOptions, PageExtractor};
pub use pipeline::headers::{FontHistogram, HeaderRanks};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
