//! Font-statistics header classification.
//!
//! A document's body text is set in one dominant font size; anything printed
//! larger is a heading, and the larger it is the higher its level. This
//! module measures how many non-whitespace characters appear at each rounded
//! font size ([`FontHistogram`]) and turns that into ordinal header ranks
//! ([`HeaderRanks`]).
//!
//! ```text
//! size  chars        body = 12 (most characters)
//!  24      10   ──▶  rank 1
//!  18      40   ──▶  rank 2
//!  12    9000        body text, no rank
//! ```
//!
//! The classifier is independent of artifact writing: plain-text extraction
//! never consults it, [`crate::config::TextMode::Markdown`] does, and the CLI
//! can print it for a single document with `--inspect-headers`.

use crate::error::DocumentError;
use crate::pipeline::engine::{EngineDocument, TextSpan};
use serde::Serialize;
use std::collections::BTreeMap;

/// Body size assumed when a document has no extractable text at all.
pub const FALLBACK_BODY_SIZE: f32 = 12.0;

/// Round a font size the way the histogram keys it: to the nearest integer,
/// ties to even (so 12.5 → 12 and 13.5 → 14).
pub fn round_size(size: f32) -> i32 {
    size.round_ties_even() as i32
}

/// Cumulative non-whitespace character counts per rounded font size.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontHistogram {
    /// `(size, chars)` in first-seen order; the order breaks dominance ties.
    entries: Vec<(i32, usize)>,
}

impl FontHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spans<'a>(spans: impl IntoIterator<Item = &'a TextSpan>) -> Self {
        let mut hist = Self::new();
        for span in spans {
            hist.add_span(span);
        }
        hist
    }

    /// Count a span's stripped characters under its rounded size.
    /// Blank spans are ignored.
    pub fn add_span(&mut self, span: &TextSpan) {
        if span.is_blank() {
            return;
        }
        self.add(round_size(span.size), span.text.trim().chars().count());
    }

    /// Add `chars` characters at an already-rounded `size`.
    pub fn add(&mut self, size: i32, chars: usize) {
        match self.entries.iter_mut().find(|(s, _)| *s == size) {
            Some((_, count)) => *count += chars,
            None => self.entries.push((size, chars)),
        }
    }

    pub fn count(&self, size: i32) -> usize {
        self.entries
            .iter()
            .find(|(s, _)| *s == size)
            .map_or(0, |(_, c)| *c)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The size with the most characters; the earliest-seen size wins a tie.
    pub fn dominant_size(&self) -> Option<i32> {
        let mut best: Option<(i32, usize)> = None;
        for &(size, count) in &self.entries {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((size, count));
            }
        }
        best.map(|(size, _)| size)
    }

    /// Sizes with their counts, ascending by size.
    pub fn iter(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        let sorted: BTreeMap<i32, usize> = self.entries.iter().copied().collect();
        sorted.into_iter()
    }
}

/// Header level per rounded font size; 1 is the most prominent.
///
/// Only sizes strictly larger than the body size are ranked, densely and in
/// descending size order. A document set in a single size has no ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderRanks {
    body_limit: f32,
    ranks: BTreeMap<i32, u32>,
}

impl HeaderRanks {
    /// Rank the sizes of `histogram`.
    ///
    /// Without an explicit `body_limit` the dominant size is taken as body
    /// text, or [`FALLBACK_BODY_SIZE`] when the histogram is empty.
    pub fn from_histogram(histogram: &FontHistogram, body_limit: Option<f32>) -> Self {
        let body_limit = body_limit
            .or_else(|| histogram.dominant_size().map(|s| s as f32))
            .unwrap_or(FALLBACK_BODY_SIZE);

        let mut sizes: Vec<i32> = histogram
            .entries
            .iter()
            .map(|(s, _)| *s)
            .filter(|&s| s as f32 > body_limit)
            .collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));

        let ranks = sizes
            .into_iter()
            .enumerate()
            .map(|(i, size)| (size, i as u32 + 1))
            .collect();

        Self { body_limit, ranks }
    }

    /// One pass over the spans of the given 0-based pages (all pages when `None`).
    pub fn from_document(
        doc: &dyn EngineDocument,
        pages: Option<&[usize]>,
        body_limit: Option<f32>,
    ) -> Result<Self, DocumentError> {
        let histogram = histogram_for_document(doc, pages)?;
        Ok(Self::from_histogram(&histogram, body_limit))
    }

    /// Header rank of a font size, or `None` for body text.
    pub fn rank_of(&self, font_size: f32) -> Option<u32> {
        self.ranks.get(&round_size(font_size)).copied()
    }

    /// Markdown heading prefix for a font size (`"## "` for rank 2), empty for body text.
    pub fn header_prefix(&self, font_size: f32) -> String {
        match self.rank_of(font_size) {
            Some(rank) => format!("{} ", "#".repeat(rank as usize)),
            None => String::new(),
        }
    }

    pub fn body_limit(&self) -> f32 {
        self.body_limit
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// `(size, rank)` pairs, most prominent first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.ranks.iter().rev().map(|(s, r)| (*s, *r))
    }
}

/// Build the font histogram of selected pages (all pages when `None`).
///
/// Out-of-range page indices are ignored.
pub fn histogram_for_document(
    doc: &dyn EngineDocument,
    pages: Option<&[usize]>,
) -> Result<FontHistogram, DocumentError> {
    let total = doc.page_count();
    let indices: Vec<usize> = match pages {
        Some(p) => p.iter().copied().filter(|&i| i < total).collect(),
        None => (0..total).collect(),
    };

    let mut histogram = FontHistogram::new();
    for index in indices {
        for span in doc.text_spans(index)? {
            histogram.add_span(&span);
        }
    }
    Ok(histogram)
}
