//! Configuration types for batch conversion.
//!
//! All run behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share the config with worker threads and to log exactly what a run was
//! asked to do.

use crate::error::BatchError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default minimum number of characters a page needs for its text artifact.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 500;

/// Default checklist file name, resolved against the working directory.
pub const DEFAULT_CHECKLIST: &str = "processed_files.json";

/// Configuration for a batch conversion run.
///
/// Built via [`BatchConfig::builder()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfbatch::{ArtifactKinds, BatchConfig};
///
/// let config = BatchConfig::builder("/data/reports")
///     .image_dir("/data/out/img")
///     .text_dir("/data/out/text")
///     .artifacts(ArtifactKinds::Both)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.min_text_chars, 500);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory enumerated recursively for source documents.
    pub corpus_root: PathBuf,

    /// Flat output directory for page images. Default: `{root}/all_img`.
    pub image_dir: PathBuf,

    /// Output directory for page text; one subdirectory per document.
    /// Default: `{root}/output_texts/all_texts`.
    pub text_dir: PathBuf,

    /// JSON file recording fully processed documents. Default: `processed_files.json`.
    pub checklist_path: PathBuf,

    /// Accepted document extension, matched case-insensitively. Default: `pdf`.
    pub extension: String,

    /// Which artifacts each document produces. Default: both.
    pub artifacts: ArtifactKinds,

    /// Pages with fewer characters than this get no text artifact. Default: 500.
    ///
    /// Covers, blank pages and pages holding only a running header are noise
    /// for downstream text consumers.
    pub min_text_chars: usize,

    /// Render scale applied to both axes. Default: 1.0 (72 DPI).
    pub image_scale: f32,

    /// How page text is produced. Default: [`TextMode::Plain`].
    pub text_mode: TextMode,

    /// Rejoin words hyphenated across line breaks. Default: true.
    pub dehyphenate: bool,

    /// Drop text lying outside the visible page box. Default: true.
    ///
    /// Plain mode only: markdown mode reads every text object of the page,
    /// so turning clipping off there is rejected by the builder.
    pub clip_to_page: bool,

    /// Documents processed in parallel. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Per-document processing limit. `None` disables it. Default: 300 s.
    ///
    /// A timed-out document is reported as failed and retried next run; the
    /// rest of the batch is not held up.
    pub document_timeout: Option<Duration>,

    /// What to do when the checklist file is not valid JSON. Default: fail.
    pub checklist_recovery: ChecklistRecovery,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("corpus_root", &self.corpus_root)
            .field("image_dir", &self.image_dir)
            .field("text_dir", &self.text_dir)
            .field("checklist_path", &self.checklist_path)
            .field("extension", &self.extension)
            .field("artifacts", &self.artifacts)
            .field("min_text_chars", &self.min_text_chars)
            .field("image_scale", &self.image_scale)
            .field("text_mode", &self.text_mode)
            .field("dehyphenate", &self.dehyphenate)
            .field("clip_to_page", &self.clip_to_page)
            .field("concurrency", &self.concurrency)
            .field("document_timeout", &self.document_timeout)
            .field("checklist_recovery", &self.checklist_recovery)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a builder with defaults derived from `corpus_root`.
    pub fn builder(corpus_root: impl Into<PathBuf>) -> BatchConfigBuilder {
        let corpus_root = corpus_root.into();
        BatchConfigBuilder {
            config: Self {
                image_dir: corpus_root.join("all_img"),
                text_dir: corpus_root.join("output_texts").join("all_texts"),
                corpus_root,
                checklist_path: PathBuf::from(DEFAULT_CHECKLIST),
                extension: "pdf".to_string(),
                artifacts: ArtifactKinds::default(),
                min_text_chars: DEFAULT_MIN_TEXT_CHARS,
                image_scale: 1.0,
                text_mode: TextMode::default(),
                dehyphenate: true,
                clip_to_page: true,
                concurrency: 1,
                document_timeout: Some(Duration::from_secs(300)),
                checklist_recovery: ChecklistRecovery::default(),
                password: None,
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.text_dir = dir.into();
        self
    }

    pub fn checklist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checklist_path = path.into();
        self
    }

    /// Accepted extension, with or without the leading dot.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.config.extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn artifacts(mut self, kinds: ArtifactKinds) -> Self {
        self.config.artifacts = kinds;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn image_scale(mut self, scale: f32) -> Self {
        self.config.image_scale = if scale.is_finite() {
            scale.clamp(0.1, 8.0)
        } else {
            scale
        };
        self
    }

    pub fn text_mode(mut self, mode: TextMode) -> Self {
        self.config.text_mode = mode;
        self
    }

    pub fn dehyphenate(mut self, v: bool) -> Self {
        self.config.dehyphenate = v;
        self
    }

    pub fn clip_to_page(mut self, v: bool) -> Self {
        self.config.clip_to_page = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn document_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.document_timeout = timeout;
        self
    }

    /// Per-document limit in seconds; `0` disables the limit.
    pub fn document_timeout_secs(mut self, secs: u64) -> Self {
        self.config.document_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn checklist_recovery(mut self, policy: ChecklistRecovery) -> Self {
        self.config.checklist_recovery = policy;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(BatchError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.extension.is_empty() {
            return Err(BatchError::InvalidConfig(
                "Document extension must not be empty".into(),
            ));
        }
        if !c.image_scale.is_finite() || c.image_scale <= 0.0 {
            return Err(BatchError::InvalidConfig(format!(
                "Image scale must be a positive number, got {}",
                c.image_scale
            )));
        }
        if c.text_mode == TextMode::Markdown && !c.clip_to_page {
            return Err(BatchError::InvalidConfig(
                "Disabling page clipping is only supported in plain text mode".into(),
            ));
        }
        if c.document_timeout == Some(Duration::ZERO) {
            return Err(BatchError::InvalidConfig(
                "Document timeout must be > 0 (use None to disable)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which derived artifacts a run produces for each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArtifactKinds {
    /// One PNG per page only.
    Images,
    /// One text file per sufficiently long page only.
    Text,
    /// Both images and text. (default)
    #[default]
    Both,
}

impl ArtifactKinds {
    pub fn images(self) -> bool {
        matches!(self, ArtifactKinds::Images | ArtifactKinds::Both)
    }

    pub fn text(self) -> bool {
        matches!(self, ArtifactKinds::Text | ArtifactKinds::Both)
    }
}

/// How page text artifacts are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMode {
    /// The engine's plain page text; font classification is not applied. (default)
    #[default]
    Plain,
    /// Text rebuilt from spans, with `#`-prefixed lines for header-sized spans.
    Markdown,
}

/// Policy for a checklist file that exists but cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChecklistRecovery {
    /// Abort the run with [`BatchError::ChecklistCorrupt`]. (default)
    #[default]
    Fail,
    /// Warn loudly and start from an empty set; documents may be reprocessed.
    Reset,
}
