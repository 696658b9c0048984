//! Post-processing: deterministic cleanup of engine-extracted page text.
//!
//! pdfium returns text with `\r\n` line endings, keeps words split by a
//! line-end hyphen, and marks soft hyphens with control characters. These
//! rules normalise that without touching content. Each rule is a pure
//! `&str → String` function and is independently testable.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the hyphenation rule only has to
//! recognise `\n`; invisible characters are stripped last because the soft
//! hyphen is one of them and dehyphenation needs to see it at a line end.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean the plain text of one page.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Rejoin words hyphenated across a line break (when `dehyphenate`)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, pdfium markers)
pub fn clean_page_text(input: &str, dehyphenate: bool) -> String {
    let s = normalise_line_endings(input);
    let s = if dehyphenate {
        dehyphenate_line_breaks(&s)
    } else {
        s
    };
    remove_invisible_chars(&s)
}

/// Clean a page rendered with `#` heading prefixes.
///
/// Applies [`clean_page_text`], then puts a blank line before every heading
/// and collapses runs of blank lines.
pub fn clean_markdown_page(input: &str, dehyphenate: bool) -> String {
    let s = clean_page_text(input, dehyphenate);
    let s = trim_trailing_whitespace(&s);
    let s = normalise_heading_spacing(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Rejoin hyphenated words ──────────────────────────────────────────
//
// A letter, a hyphen (ASCII, soft hyphen, or pdfium's U+0002 marker), a line
// break and a letter on the next line are one word split by the layout.
// The line break is dropped together with the hyphen, joining the two lines.

static RE_LINE_END_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})[-\x{00AD}\x{0002}]\n[ \t]*(\p{L})").unwrap());

fn dehyphenate_line_breaks(input: &str) -> String {
    RE_LINE_END_HYPHEN.replace_all(input, "$1$2").to_string()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{0002}',
        ],
        "",
    )
}

// ── Markdown rules ───────────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalise_heading_spacing(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    for (i, line) in input.lines().enumerate() {
        if is_heading(line) && i > 0 {
            let trimmed = result.trim_end_matches('\n');
            result.truncate(trimmed.len());
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    hashes > 0 && line[hashes..].starts_with(' ')
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
