//! Integration tests for the resumable batch runner.
//!
//! No pdfium library is needed: "PDF" files in these corpora are JSON
//! fixtures read by [`FixtureEngine`], so each test controls exactly which
//! pages a document has, which ones fail, and how long opening takes.
//!
//! Run with:
//!   cargo test --test batch

use edgequake_pdfbatch::{
    ArtifactKinds, BatchConfig, BatchError, BatchProgressCallback, BatchReport, BatchRunner,
    ChecklistRecovery, DocumentEngine, DocumentError, DocumentSummary, EngineDocument, TextMode,
    TextSpan,
};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Fixture engine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
struct FixtureDocument {
    #[serde(default)]
    pages: Vec<FixturePage>,
    #[serde(default)]
    open_delay_ms: u64,
    #[serde(default)]
    panic_on_open: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FixturePage {
    #[serde(default)]
    text: String,
    #[serde(default)]
    spans: Vec<TextSpan>,
    #[serde(default)]
    render_error: bool,
}

/// Reads each document as a JSON [`FixtureDocument`]; anything else is a
/// corrupt document.
#[derive(Default)]
struct FixtureEngine {
    opened: Mutex<Vec<PathBuf>>,
}

impl FixtureEngine {
    fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

impl DocumentEngine for FixtureEngine {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn EngineDocument + 'a>, DocumentError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        let open_failed = |detail: String| DocumentError::OpenFailed {
            path: path.to_path_buf(),
            detail,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| open_failed(e.to_string()))?;
        let doc: FixtureDocument =
            serde_json::from_str(&raw).map_err(|e| open_failed(e.to_string()))?;
        if doc.panic_on_open {
            panic!("fixture asked to panic");
        }
        if doc.open_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(doc.open_delay_ms));
        }
        Ok(Box::new(doc))
    }
}

impl FixtureDocument {
    fn page(&self, index: usize) -> Result<&FixturePage, DocumentError> {
        self.pages
            .get(index)
            .ok_or_else(|| DocumentError::PageLoadFailed {
                page: index + 1,
                detail: "no such page".into(),
            })
    }
}

impl EngineDocument for FixtureDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize, _clip_to_page: bool) -> Result<String, DocumentError> {
        Ok(self.page(index)?.text.clone())
    }

    fn text_spans(&self, index: usize) -> Result<Vec<TextSpan>, DocumentError> {
        Ok(self.page(index)?.spans.clone())
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, DocumentError> {
        if self.page(index)?.render_error {
            return Err(DocumentError::RenderFailed {
                page: index + 1,
                detail: "fixture render error".into(),
            });
        }
        let side = (8.0 * scale).round().max(1.0) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            side,
            side,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Workspace {
    _tmp: TempDir,
    root: PathBuf,
    state: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("corpus");
        let state = tmp.path().join("state");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&state).unwrap();
        Self {
            _tmp: tmp,
            root,
            state,
        }
    }

    fn checklist(&self) -> PathBuf {
        self.state.join("processed_files.json")
    }

    fn builder(&self) -> edgequake_pdfbatch::BatchConfigBuilder {
        BatchConfig::builder(&self.root).checklist_path(self.checklist())
    }

    fn config(&self) -> BatchConfig {
        self.builder().build().unwrap()
    }

    fn write_doc(&self, rel: &str, pages: &[&str]) -> PathBuf {
        let doc = serde_json::json!({
            "pages": pages.iter().map(|t| serde_json::json!({ "text": t })).collect::<Vec<_>>()
        });
        self.write_raw(rel, &doc.to_string())
    }

    fn write_raw(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn recorded(&self) -> Vec<PathBuf> {
        let raw = std::fs::read_to_string(self.checklist()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

fn runner(engine: &Arc<FixtureEngine>, config: BatchConfig) -> BatchRunner {
    BatchRunner::new(Arc::clone(engine) as Arc<dyn DocumentEngine>, config)
}

fn long_text(n: usize) -> String {
    "x".repeat(n)
}

// ── End-to-end scenario ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_page_document_end_to_end() {
    let ws = Workspace::new();
    let page2 = long_text(600);
    let a = ws.write_doc("a.pdf", &["cover", &page2, ""]);
    ws.write_raw("b.txt", "not a document");

    let engine = Arc::new(FixtureEngine::default());
    let config = ws.config();
    let report = runner(&engine, config.clone()).run().await.unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.completed.len(), 1);
    assert!(report.is_clean());

    let written = std::fs::read_to_string(ws.checklist()).unwrap();
    assert_eq!(written, format!("[\n    \"{}\"\n]", a.display()));

    for n in 1..=3 {
        assert!(config.image_dir.join(format!("a-page{n}.png")).is_file());
    }
    let text_dir = config.text_dir.join("a");
    let texts: Vec<_> = std::fs::read_dir(&text_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(texts, vec!["a-page2.txt".to_string()]);
    assert_eq!(
        std::fs::read_to_string(text_dir.join("a-page2.txt")).unwrap(),
        page2
    );
    assert_eq!(engine.opened(), vec![a]);
}

#[tokio::test]
async fn test_nested_documents_are_discovered_case_insensitively() {
    let ws = Workspace::new();
    ws.write_doc("2023/q1/report.PDF", &["x"]);
    ws.write_doc("2024/summary.pdf", &["y"]);

    let engine = Arc::new(FixtureEngine::default());
    let report = runner(&engine, ws.config()).run().await.unwrap();

    assert_eq!(report.completed.len(), 2);
    assert_eq!(
        ws.recorded(),
        vec![
            ws.root.join("2023/q1/report.PDF"),
            ws.root.join("2024/summary.pdf"),
        ]
    );
}

// ── Resumability ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let ws = Workspace::new();
    ws.write_doc("a.pdf", &["one"]);
    ws.write_doc("b.pdf", &["two"]);

    let engine = Arc::new(FixtureEngine::default());
    let first = runner(&engine, ws.config()).run().await.unwrap();
    assert_eq!(first.completed.len(), 2);
    let checklist_before = std::fs::read_to_string(ws.checklist()).unwrap();

    let second = runner(&engine, ws.config()).run().await.unwrap();
    assert_eq!(second.already_processed, 2);
    assert_eq!(second.pending(), 0);
    assert!(second.completed.is_empty());
    assert_eq!(engine.opened().len(), 2, "no document opened twice");
    assert_eq!(
        std::fs::read_to_string(ws.checklist()).unwrap(),
        checklist_before
    );
}

#[tokio::test]
async fn test_failed_document_is_retried_next_run() {
    let ws = Workspace::new();
    let a = ws.write_doc("a.pdf", &["fine"]);
    let b = ws.write_raw("b.pdf", "%PDF-1.7 truncated garbage");

    let engine = Arc::new(FixtureEngine::default());
    let first = runner(&engine, ws.config()).run().await.unwrap();
    assert_eq!(first.completed.len(), 1);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].path, b);
    assert_eq!(ws.recorded(), vec![a.clone()]);

    // Repair the document and rerun: only it is attempted.
    ws.write_doc("b.pdf", &["repaired"]);
    let engine = Arc::new(FixtureEngine::default());
    let second = runner(&engine, ws.config()).run().await.unwrap();
    assert_eq!(engine.opened(), vec![b.clone()]);
    assert_eq!(second.completed.len(), 1);
    assert_eq!(ws.recorded(), vec![a, b]);
}

#[tokio::test]
async fn test_corrupt_document_does_not_stop_the_batch() {
    // The corrupt document first, in the middle, and last.
    for bad in 0..3 {
        let ws = Workspace::new();
        let mut good = Vec::new();
        let mut corrupt = PathBuf::new();
        for i in 0..3 {
            let name = format!("doc{i}.pdf");
            if i == bad {
                corrupt = ws.write_raw(&name, "{ this is not a fixture");
            } else {
                good.push(ws.write_doc(&name, &["readable"]));
            }
        }

        let engine = Arc::new(FixtureEngine::default());
        let report = runner(&engine, ws.config()).run().await.unwrap();

        assert_eq!(engine.opened().len(), 3, "corrupt at {bad}");
        assert_eq!(ws.recorded(), good, "corrupt at {bad}");
        assert_eq!(report.completed.len(), 2, "corrupt at {bad}");
        assert_eq!(report.failed.len(), 1, "corrupt at {bad}");
        assert_eq!(report.failed[0].path, corrupt);
        assert!(matches!(
            report.failed[0].error,
            DocumentError::OpenFailed { .. }
        ));
        assert!(!report.is_clean());
    }
}

#[tokio::test]
async fn test_render_failure_leaves_document_pending() {
    let ws = Workspace::new();
    ws.write_raw(
        "a.pdf",
        r#"{"pages": [{"text": "ok"}, {"text": "bad", "render_error": true}]}"#,
    );

    let engine = Arc::new(FixtureEngine::default());
    let report = runner(&engine, ws.config()).run().await.unwrap();

    assert!(matches!(
        report.failed[0].error,
        DocumentError::RenderFailed { page: 2, .. }
    ));
    assert!(!ws.checklist().exists());
}

#[tokio::test]
async fn test_panicking_document_is_isolated() {
    let ws = Workspace::new();
    ws.write_raw("a.pdf", r#"{"panic_on_open": true}"#);
    let b = ws.write_doc("b.pdf", &["fine"]);

    let engine = Arc::new(FixtureEngine::default());
    let report = runner(&engine, ws.config()).run().await.unwrap();

    assert!(matches!(
        report.failed[0].error,
        DocumentError::Panicked { .. }
    ));
    assert_eq!(ws.recorded(), vec![b]);
}

// ── Timeouts, cancellation, concurrency ──────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_document_times_out() {
    let ws = Workspace::new();
    ws.write_raw("slow.pdf", r#"{"open_delay_ms": 1500, "pages": [{"text": "z"}]}"#);
    let fast = ws.write_doc("fast.pdf", &["quick"]);

    let engine = Arc::new(FixtureEngine::default());
    let config = ws
        .builder()
        .document_timeout(Some(Duration::from_millis(100)))
        .build()
        .unwrap();
    let report = runner(&engine, config).run().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].error,
        DocumentError::Timeout { limit_ms: 100 }
    ));
    assert_eq!(ws.recorded(), vec![fast]);
}

#[tokio::test]
async fn test_shutdown_before_start_records_nothing() {
    let ws = Workspace::new();
    ws.write_doc("a.pdf", &["one"]);

    let engine = Arc::new(FixtureEngine::default());
    let report = runner(&engine, ws.config())
        .run_until(std::future::ready(()))
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.not_attempted(), 1);
    assert!(!ws.checklist().exists());
}

/// Signals shutdown once the first document completes.
struct StopAfterFirst(Arc<tokio::sync::Notify>);

impl BatchProgressCallback for StopAfterFirst {
    fn on_document_complete(&self, _summary: &DocumentSummary) {
        self.0.notify_one();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_in_flight_document_is_not_recorded_after_shutdown() {
    let ws = Workspace::new();
    // Both documents start together; b is still open when a completes.
    let a = ws.write_raw("a.pdf", r#"{"open_delay_ms": 200, "pages": [{"text": "fast"}]}"#);
    let b = ws.write_raw("b.pdf", r#"{"open_delay_ms": 1500, "pages": [{"text": "slow"}]}"#);

    let notify = Arc::new(tokio::sync::Notify::new());
    let config = ws
        .builder()
        .concurrency(2)
        .progress_callback(Arc::new(StopAfterFirst(Arc::clone(&notify))))
        .build()
        .unwrap();

    let engine = Arc::new(FixtureEngine::default());
    let shutdown = {
        let notify = Arc::clone(&notify);
        async move { notify.notified().await }
    };
    let report = runner(&engine, config).run_until(shutdown).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.completed.len(), 1);
    assert!(report.failed.is_empty());
    assert!(engine.opened().contains(&b), "b was in flight");
    assert_eq!(ws.recorded(), vec![a]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_run_records_every_document_once() {
    let ws = Workspace::new();
    let mut expected = HashSet::new();
    for i in 0..8 {
        let doc = serde_json::json!({
            "open_delay_ms": 20 * (8 - i),
            "pages": [{ "text": long_text(500 + i as usize) }]
        });
        expected.insert(ws.write_raw(&format!("doc{i}.pdf"), &doc.to_string()));
    }

    let engine = Arc::new(FixtureEngine::default());
    let config = ws.builder().concurrency(4).build().unwrap();
    let report = runner(&engine, config.clone()).run().await.unwrap();

    assert_eq!(report.completed.len(), 8);
    let recorded = ws.recorded();
    assert_eq!(recorded.len(), 8);
    assert_eq!(recorded.into_iter().collect::<HashSet<_>>(), expected);
    for i in 0..8 {
        assert!(config
            .text_dir
            .join(format!("doc{i}/doc{i}-page1.txt"))
            .is_file());
    }
}

// ── Artifact selection and text modes ────────────────────────────────────────

#[tokio::test]
async fn test_text_only_run_writes_no_images() {
    let ws = Workspace::new();
    ws.write_doc("a.pdf", &[&long_text(700)]);

    let engine = Arc::new(FixtureEngine::default());
    let config = ws.builder().artifacts(ArtifactKinds::Text).build().unwrap();
    let report = runner(&engine, config.clone()).run().await.unwrap();

    assert_eq!(report.completed[0].images_written, 0);
    assert_eq!(report.completed[0].texts_written, 1);
    assert!(!config.image_dir.exists());
    assert!(config.text_dir.join("a/a-page1.txt").is_file());
}

#[tokio::test]
async fn test_images_only_run_writes_no_text() {
    let ws = Workspace::new();
    ws.write_doc("a.pdf", &[&long_text(700), "short"]);

    let engine = Arc::new(FixtureEngine::default());
    let config = ws
        .builder()
        .artifacts(ArtifactKinds::Images)
        .image_scale(2.0)
        .build()
        .unwrap();
    runner(&engine, config.clone()).run().await.unwrap();

    assert!(!config.text_dir.exists());
    let img = image::open(config.image_dir.join("a-page2.png")).unwrap();
    assert_eq!(img.width(), 16);
}

#[tokio::test]
async fn test_markdown_mode_prefixes_headers() {
    let ws = Workspace::new();
    let body = long_text(600);
    let doc = serde_json::json!({
        "pages": [{
            "spans": [
                { "text": "Annual Report", "size": 24.0 },
                { "text": body, "size": 12.0 }
            ]
        }]
    });
    ws.write_raw("a.pdf", &doc.to_string());

    let engine = Arc::new(FixtureEngine::default());
    let config = ws.builder().text_mode(TextMode::Markdown).build().unwrap();
    runner(&engine, config.clone()).run().await.unwrap();

    let text = std::fs::read_to_string(config.text_dir.join("a/a-page1.txt")).unwrap();
    assert!(text.starts_with("# Annual Report\n"), "got: {text:?}");
    assert!(text.contains(&body));
}

#[tokio::test]
async fn test_threshold_counts_characters_not_bytes() {
    let ws = Workspace::new();
    // 500 three-byte characters.
    let cjk = "研".repeat(500);
    ws.write_doc("a.pdf", &[&cjk, &"研".repeat(499)]);

    let engine = Arc::new(FixtureEngine::default());
    let config = ws.config();
    let report = runner(&engine, config.clone()).run().await.unwrap();

    assert_eq!(report.completed[0].texts_written, 1);
    assert_eq!(report.completed[0].texts_filtered, 1);
    assert!(config.text_dir.join("a/a-page1.txt").is_file());
    assert!(!config.text_dir.join("a/a-page2.txt").exists());
}

// ── Fatal conditions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_corpus_root_is_fatal() {
    let ws = Workspace::new();
    let config = BatchConfig::builder(ws.root.join("nope"))
        .checklist_path(ws.checklist())
        .build()
        .unwrap();
    let engine = Arc::new(FixtureEngine::default());
    let err = runner(&engine, config).run().await.unwrap_err();
    assert!(matches!(err, BatchError::CorpusNotFound { .. }));
}

#[tokio::test]
async fn test_corrupt_checklist_is_fatal_unless_recovery_requested() {
    let ws = Workspace::new();
    let a = ws.write_doc("a.pdf", &["one"]);
    std::fs::write(ws.checklist(), "[\"/truncated").unwrap();

    let engine = Arc::new(FixtureEngine::default());
    let err = runner(&engine, ws.config()).run().await.unwrap_err();
    assert!(matches!(err, BatchError::ChecklistCorrupt { .. }));
    assert!(engine.opened().is_empty());

    let config = ws
        .builder()
        .checklist_recovery(ChecklistRecovery::Reset)
        .build()
        .unwrap();
    let report = runner(&engine, config).run().await.unwrap();
    assert_eq!(report.completed.len(), 1);
    assert_eq!(ws.recorded(), vec![a]);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventCounter {
    batch_pending: AtomicUsize,
    starts: AtomicUsize,
    completes: AtomicUsize,
    errors: AtomicUsize,
    finished: AtomicUsize,
}

impl BatchProgressCallback for EventCounter {
    fn on_batch_start(&self, pending: usize, _already_processed: usize) {
        self.batch_pending.store(pending, Ordering::SeqCst);
    }
    fn on_document_start(&self, _path: &Path, _index: usize, _total: usize) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_complete(&self, _summary: &DocumentSummary) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_error(&self, _path: &Path, _error: &DocumentError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, _report: &BatchReport) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_progress_callback_sees_every_document() {
    let ws = Workspace::new();
    ws.write_doc("a.pdf", &["one"]);
    ws.write_raw("b.pdf", "garbage");
    ws.write_doc("c.pdf", &["three"]);

    let counter = Arc::new(EventCounter::default());
    let config = ws
        .builder()
        .progress_callback(Arc::clone(&counter) as Arc<dyn BatchProgressCallback>)
        .build()
        .unwrap();
    let engine = Arc::new(FixtureEngine::default());
    runner(&engine, config).run().await.unwrap();

    assert_eq!(counter.batch_pending.load(Ordering::SeqCst), 3);
    assert_eq!(counter.starts.load(Ordering::SeqCst), 3);
    assert_eq!(counter.completes.load(Ordering::SeqCst), 2);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counter.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_plan_lists_pending_without_opening() {
    let ws = Workspace::new();
    let a = ws.write_doc("a.pdf", &["one"]);
    let b = ws.write_doc("b.pdf", &["two"]);
    std::fs::write(
        ws.checklist(),
        serde_json::to_string(&vec![a.clone()]).unwrap(),
    )
    .unwrap();

    let engine = Arc::new(FixtureEngine::default());
    let plan = runner(&engine, ws.config()).plan().unwrap();
    assert_eq!(plan.discovered, vec![a, b.clone()]);
    assert_eq!(plan.pending, vec![b]);
    assert_eq!(plan.already_processed, 1);
    assert!(engine.opened().is_empty());
}
