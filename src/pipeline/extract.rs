//! Page content extraction: one text payload per page, in page order.
//!
//! A page without extractable text yields an empty string rather than a gap,
//! so the `n`-th entry always belongs to page `n + 1`. Any engine failure
//! aborts the whole document; partial page lists are never returned.

use crate::config::{BatchConfig, TextMode};
use crate::error::DocumentError;
use crate::pipeline::engine::{EngineDocument, TextSpan};
use crate::pipeline::headers::HeaderRanks;
use crate::pipeline::postprocess;
use std::borrow::Cow;
use tracing::debug;

/// Text extraction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub mode: TextMode,
    pub dehyphenate: bool,
    /// Only applies to [`TextMode::Plain`]; span-based markdown is unclipped.
    pub clip_to_page: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mode: TextMode::Plain,
            dehyphenate: true,
            clip_to_page: true,
        }
    }
}

impl From<&BatchConfig> for ExtractOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            mode: config.text_mode,
            dehyphenate: config.dehyphenate,
            clip_to_page: config.clip_to_page,
        }
    }
}

/// Produces per-page text for a document.
///
/// In markdown mode the header ranks are computed per document unless a
/// shared set was supplied with [`PageExtractor::with_header_ranks`].
#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    options: ExtractOptions,
    ranks: Option<HeaderRanks>,
}

impl PageExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            ranks: None,
        }
    }

    /// Reuse one classification across documents sharing font conventions.
    pub fn with_header_ranks(mut self, ranks: HeaderRanks) -> Self {
        self.ranks = Some(ranks);
        self
    }

    pub fn extract(&self, doc: &dyn EngineDocument) -> Result<Vec<String>, DocumentError> {
        match self.options.mode {
            TextMode::Plain => self.extract_plain(doc),
            TextMode::Markdown => self.extract_markdown(doc),
        }
    }

    fn extract_plain(&self, doc: &dyn EngineDocument) -> Result<Vec<String>, DocumentError> {
        let total = doc.page_count();
        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            let raw = doc.page_text(index, self.options.clip_to_page)?;
            let text = postprocess::clean_page_text(&raw, self.options.dehyphenate);
            debug!("Extracted page {} ({} chars)", index + 1, text.chars().count());
            pages.push(text);
        }
        Ok(pages)
    }

    fn extract_markdown(&self, doc: &dyn EngineDocument) -> Result<Vec<String>, DocumentError> {
        let ranks = match &self.ranks {
            Some(r) => Cow::Borrowed(r),
            None => Cow::Owned(HeaderRanks::from_document(doc, None, None)?),
        };
        debug!(
            "Header ranks: body size {}, {} header levels",
            ranks.body_limit(),
            ranks.len()
        );

        let total = doc.page_count();
        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            let spans = doc.text_spans(index)?;
            let raw = render_spans(&spans, &ranks);
            pages.push(postprocess::clean_markdown_page(
                &raw,
                self.options.dehyphenate,
            ));
        }
        Ok(pages)
    }
}

/// Extract every page of `doc` with `options`.
pub fn extract_pages(
    doc: &dyn EngineDocument,
    options: ExtractOptions,
) -> Result<Vec<String>, DocumentError> {
    PageExtractor::new(options).extract(doc)
}

/// One line per non-blank span; header-sized spans get their `#` prefix.
fn render_spans(spans: &[TextSpan], ranks: &HeaderRanks) -> String {
    let mut out = String::new();
    for span in spans.iter().filter(|s| !s.is_blank()) {
        let prefix = ranks.header_prefix(span.size);
        if prefix.is_empty() {
            out.push_str(span.text.trim_end());
        } else {
            out.push_str(&prefix);
            out.push_str(span.text.trim());
        }
        out.push('\n');
    }
    out
}
