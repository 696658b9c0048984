//! CLI binary for edgequake-pdfbatch.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfbatch::pipeline::headers::histogram_for_document;
use edgequake_pdfbatch::{
    ArtifactKinds, BatchConfig, BatchProgressCallback, BatchReport, BatchRunner,
    ChecklistRecovery, DocumentError, DocumentEngine, DocumentSummary, HeaderRanks, PdfiumEngine,
    ProgressCallback, TextMode, DEFAULT_CHECKLIST, DEFAULT_MIN_TEXT_CHARS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the pending documents plus a log
/// line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Walking corpus…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, pending: usize, already_processed: usize) {
        self.activate_bar(pending);
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("{pending} documents pending")),
            dim(&format!("{already_processed} already processed")),
        ));
    }

    fn on_document_start(&self, path: &Path, _index: usize, _total: usize) {
        self.bar.set_message(file_name(path));
    }

    fn on_document_complete(&self, summary: &DocumentSummary) {
        self.bar.println(format!(
            "  {} {:<48}  {}  {}",
            green("✓"),
            file_name(&summary.path),
            dim(&format!(
                "{:>4} pages  {:>4} texts",
                summary.page_count, summary.texts_written
            )),
            dim(&format!("{:.1}s", summary.duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, path: &Path, error: &DocumentError) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let error = error.to_string();
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };

        self.bar.println(format!(
            "  {} {:<48}  {}",
            red("✗"),
            file_name(path),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        let mark = if report.cancelled || failed > 0 {
            cyan("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{} {} converted, {} failed, {} skipped{}  {}",
            mark,
            bold(&report.completed.len().to_string()),
            if failed > 0 {
                red(&failed.to_string())
            } else {
                failed.to_string()
            },
            report.already_processed,
            if report.cancelled {
                format!(", {} left for next run", report.not_attempted())
            } else {
                String::new()
            },
            dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a corpus: page PNGs in <root>/all_img, page texts in
  # <root>/output_texts/all_texts, checklist in ./processed_files.json
  pdfbatch /data/reports

  # Text only, explicit output locations
  pdfbatch /data/reports --artifacts text --text-dir /out/text --checklist /out/done.json

  # Four documents at a time, 2x resolution images
  pdfbatch /data/reports --concurrency 4 --scale 2

  # What would the next run do?
  pdfbatch /data/reports --list-pending

  # Font-size histogram and header ranks of one document
  pdfbatch --inspect-headers /data/reports/annual-2023.pdf

  # Machine-readable run report
  pdfbatch /data/reports --json > report.json

RESUMING:
  Every fully converted document is added to the checklist as soon as it
  finishes. Rerunning the same command skips those documents and retries
  any that failed. Ctrl-C stops the run; documents in flight stay pending.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDFBATCH_*              Every flag has a PDFBATCH_<FLAG> equivalent
  RUST_LOG                Override the log filter
"#;

/// Convert a directory tree of PDF files into page images and page texts.
#[derive(Parser, Debug)]
#[command(
    name = "pdfbatch",
    version,
    about = "Resumable batch conversion of PDF corpora into page images and page text",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Corpus root directory (or a single PDF with --inspect-headers).
    input: PathBuf,

    /// Output directory for page images. Default: <root>/all_img.
    #[arg(long, env = "PDFBATCH_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Output directory for page texts. Default: <root>/output_texts/all_texts.
    #[arg(long, env = "PDFBATCH_TEXT_DIR")]
    text_dir: Option<PathBuf>,

    /// Processed-files checklist.
    #[arg(long, env = "PDFBATCH_CHECKLIST", default_value = DEFAULT_CHECKLIST)]
    checklist: PathBuf,

    /// Which artifacts to produce.
    #[arg(long, env = "PDFBATCH_ARTIFACTS", value_enum, default_value = "both")]
    artifacts: ArtifactsArg,

    /// Minimum characters for a page text to be written.
    #[arg(long, env = "PDFBATCH_MIN_TEXT_CHARS", default_value_t = DEFAULT_MIN_TEXT_CHARS)]
    min_text_chars: usize,

    /// Image render scale (1.0 = 72 DPI).
    #[arg(long, env = "PDFBATCH_SCALE", default_value_t = 1.0)]
    scale: f32,

    /// Documents processed in parallel.
    #[arg(short, long, env = "PDFBATCH_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-document time limit in seconds (0 disables).
    #[arg(long, env = "PDFBATCH_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Page text mode: plain, or markdown with header prefixes.
    #[arg(long, env = "PDFBATCH_TEXT_MODE", value_enum, default_value = "plain")]
    text_mode: TextModeArg,

    /// Accepted document extension (case-insensitive).
    #[arg(long, env = "PDFBATCH_EXTENSION", default_value = "pdf")]
    extension: String,

    /// Keep words hyphenated across line breaks as-is.
    #[arg(long, env = "PDFBATCH_NO_DEHYPHENATE")]
    no_dehyphenate: bool,

    /// Keep text lying outside the visible page box.
    #[arg(long, env = "PDFBATCH_NO_CLIP")]
    no_clip: bool,

    /// Start from an empty checklist if the existing one is corrupt.
    #[arg(long, env = "PDFBATCH_RECOVER_CHECKLIST")]
    recover_checklist: bool,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFBATCH_PASSWORD")]
    password: Option<String>,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDFBATCH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Print the documents the next run would process, then exit.
    #[arg(long, conflicts_with = "inspect_headers")]
    list_pending: bool,

    /// Print font-size histogram and header ranks of one PDF as JSON, then exit.
    #[arg(long)]
    inspect_headers: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFBATCH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ArtifactsArg {
    Images,
    Text,
    Both,
}

impl From<ArtifactsArg> for ArtifactKinds {
    fn from(v: ArtifactsArg) -> Self {
        match v {
            ArtifactsArg::Images => ArtifactKinds::Images,
            ArtifactsArg::Text => ArtifactKinds::Text,
            ArtifactsArg::Both => ArtifactKinds::Both,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum TextModeArg {
    Plain,
    Markdown,
}

impl From<TextModeArg> for TextMode {
    fn from(v: TextModeArg) -> Self {
        match v {
            TextModeArg::Plain => TextMode::Plain,
            TextModeArg::Markdown => TextMode::Markdown,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already reports every document.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && !cli.list_pending
        && !cli.inspect_headers;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-headers mode ─────────────────────────────────────────────
    if cli.inspect_headers {
        let engine = bind_engine(&cli)?;
        return inspect_headers(&engine, &cli.input);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── List-pending mode ────────────────────────────────────────────────
    // Needs no pdfium: discovery and the checklist are enough.
    if cli.list_pending {
        let runner = BatchRunner::new(Arc::new(NoEngine), config);
        let plan = runner.plan().context("Failed to plan batch")?;
        for path in &plan.pending {
            println!("{}", path.display());
        }
        if !cli.quiet {
            eprintln!(
                "{} pending, {} already processed",
                plan.pending.len(),
                plan.already_processed
            );
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let engine = bind_engine(&cli)?;
    let runner = BatchRunner::new(Arc::new(engine), config);
    let report = runner
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Batch run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // Only print inline stats when the progress callback is disabled.
        eprintln!(
            "Converted {}/{} pending documents in {}ms ({} already processed)",
            report.completed.len(),
            report.pending(),
            report.duration_ms,
            report.already_processed
        );
        for failed in &report.failed {
            eprintln!("  {} {}: {}", red("✗"), failed.path.display(), failed.error);
        }
    }

    if report.cancelled {
        // Conventional exit status for SIGINT.
        std::process::exit(130);
    }
    Ok(())
}

fn bind_engine(cli: &Cli) -> Result<PdfiumEngine> {
    PdfiumEngine::bind(cli.pdfium_lib_path.as_deref(), cli.password.clone())
        .context("Failed to initialise PDF engine")
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder(&cli.input)
        .checklist_path(&cli.checklist)
        .extension(&cli.extension)
        .artifacts(cli.artifacts.clone().into())
        .min_text_chars(cli.min_text_chars)
        .image_scale(cli.scale)
        .text_mode(cli.text_mode.clone().into())
        .dehyphenate(!cli.no_dehyphenate)
        .clip_to_page(!cli.no_clip)
        .concurrency(cli.concurrency)
        .document_timeout_secs(cli.timeout);

    if let Some(ref dir) = cli.image_dir {
        builder = builder.image_dir(dir);
    }
    if let Some(ref dir) = cli.text_dir {
        builder = builder.text_dir(dir);
    }
    if cli.recover_checklist {
        builder = builder.checklist_recovery(ChecklistRecovery::Reset);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print the font-size histogram and header ranks of one document as JSON.
fn inspect_headers(engine: &PdfiumEngine, path: &Path) -> Result<()> {
    let document = engine
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let histogram = histogram_for_document(document.as_ref(), None)
        .with_context(|| format!("Failed to read text spans of {}", path.display()))?;
    let ranks = HeaderRanks::from_histogram(&histogram, None);

    let out = serde_json::json!({
        "document": path,
        "pages": document.page_count(),
        "body_limit": ranks.body_limit(),
        "histogram": histogram
            .iter()
            .map(|(size, chars)| serde_json::json!({ "size": size, "chars": chars }))
            .collect::<Vec<_>>(),
        "header_ranks": ranks
            .iter()
            .map(|(size, rank)| serde_json::json!({
                "size": size,
                "rank": rank,
                "prefix": "#".repeat(rank as usize),
            }))
            .collect::<Vec<_>>(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("Failed to serialise header report")?
    );
    Ok(())
}

/// Engine for `--list-pending`, which never opens a document.
struct NoEngine;

impl DocumentEngine for NoEngine {
    fn open<'a>(
        &'a self,
        path: &Path,
    ) -> Result<Box<dyn edgequake_pdfbatch::EngineDocument + 'a>, DocumentError> {
        Err(DocumentError::OpenFailed {
            path: path.to_path_buf(),
            detail: "no PDF engine bound".into(),
        })
    }
}
