//! Pipeline stages for batch conversion.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and keeps the pdfium adapter the only code
//! that knows about the rendering backend.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ engine ──▶ extract ──▶ postprocess ──▶ artifacts
//! (walk root)  (pdfium)   (per page)   (cleanup)       (png / txt)
//!                            │
//!                         headers (font-size classifier, markdown mode)
//! ```
//!
//! 1. [`discover`]:   enumerate candidate documents under the corpus root
//! 2. [`engine`]:     open a document, read text and spans, rasterise pages
//! 3. [`extract`]:    one text payload per page, in page order
//! 4. [`headers`]:    font-size histogram and header ranks
//! 5. [`postprocess`]: deterministic page-text cleanup
//! 6. [`artifacts`]:  write images and sufficiently long texts to disk

pub mod artifacts;
pub mod discover;
pub mod engine;
pub mod extract;
pub mod headers;
pub mod postprocess;
