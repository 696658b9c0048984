//! Document engine seam: open a PDF, read page text and spans, rasterise pages.
//!
//! The batch pipeline only ever talks to [`DocumentEngine`] and
//! [`EngineDocument`], so tests can drive it with an in-memory engine and the
//! real [`PdfiumEngine`] stays a thin adapter over `pdfium-render`.
//!
//! ## Handle lifecycle
//!
//! [`DocumentEngine::open`] hands out a boxed document that borrows the
//! engine. pdfium closes the document when the box is dropped, so every exit
//! path out of a document's processing (including `?` mid-iteration) releases
//! the file handle.
//!
//! ## Threading
//!
//! pdfium is not async-safe. Callers run all engine work inside
//! `tokio::task::spawn_blocking`; a document handle never leaves the thread
//! that opened it. The engine itself is shared (`Send + Sync`) because
//! `pdfium-render` is built with its `sync` feature; `thread_safe`
//! serialises the underlying library calls.

use crate::error::{BatchError, DocumentError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A run of text sharing one font size within a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    /// Effective font size in points.
    pub size: f32,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
        }
    }

    /// Empty or whitespace-only spans carry no layout signal.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Opens source documents.
pub trait DocumentEngine: Send + Sync {
    /// Open the document at `path`.
    ///
    /// The returned handle is released when dropped.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn EngineDocument + 'a>, DocumentError>;
}

/// An opened document. Page indices are 0-based.
pub trait EngineDocument {
    fn page_count(&self) -> usize;

    /// Plain text of a page, optionally restricted to the visible page box.
    fn page_text(&self, index: usize, clip_to_page: bool) -> Result<String, DocumentError>;

    /// Text spans of a page with their font sizes.
    fn text_spans(&self, index: usize) -> Result<Vec<TextSpan>, DocumentError>;

    /// Rasterise a page, scaling both axes by `scale` (1.0 = 72 DPI).
    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, DocumentError>;
}

// ── pdfium adapter ──────────────────────────────────────────────────────

/// [`DocumentEngine`] backed by the pdfium C++ library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
    password: Option<String>,
}

impl PdfiumEngine {
    /// Bind to pdfium.
    ///
    /// `library` may name the shared library itself or the directory holding
    /// it; with `None` the system library search path is used.
    pub fn bind(library: Option<&Path>, password: Option<String>) -> Result<Self, BatchError> {
        let bindings = match library {
            Some(path) => {
                let lib: PathBuf = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(path)
                } else {
                    path.to_path_buf()
                };
                info!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => {
                info!("Binding system pdfium library");
                Pdfium::bind_to_system_library()
            }
        }
        .map_err(|e| BatchError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password,
        })
    }
}

impl DocumentEngine for PdfiumEngine {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn EngineDocument + 'a>, DocumentError> {
        let password = self.password.as_deref();
        let document = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        DocumentError::WrongPassword {
                            path: path.to_path_buf(),
                        }
                    } else {
                        DocumentError::PasswordRequired {
                            path: path.to_path_buf(),
                        }
                    }
                } else {
                    DocumentError::OpenFailed {
                        path: path.to_path_buf(),
                        detail: err_str,
                    }
                }
            })?;

        debug!(
            "Opened {} ({} pages)",
            path.display(),
            document.pages().len()
        );
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, DocumentError> {
        let page_index =
            PdfPageIndex::try_from(index).map_err(|_| DocumentError::PageLoadFailed {
                page: index + 1,
                detail: "page index exceeds pdfium's range".into(),
            })?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| DocumentError::PageLoadFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl EngineDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize, clip_to_page: bool) -> Result<String, DocumentError> {
        let page = self.page(index)?;
        let text = page.text().map_err(|e| DocumentError::ExtractionFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        })?;

        if clip_to_page {
            Ok(text.inside_rect(page.page_size()))
        } else {
            Ok(text.all())
        }
    }

    fn text_spans(&self, index: usize) -> Result<Vec<TextSpan>, DocumentError> {
        let page = self.page(index)?;
        let spans = page
            .objects()
            .iter()
            .filter_map(|object| {
                object
                    .as_text_object()
                    .map(|t| TextSpan::new(t.text(), t.scaled_font_size().value))
            })
            .collect();
        Ok(spans)
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, DocumentError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| DocumentError::RenderFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
