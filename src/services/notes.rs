//! Note digest extraction.
//!
//! The classifier never re-reads the source PDF; it works from a condensed
//! digest of the AI-generated analysis note attached to the item. Notes are
//! HTML blobs; the digest is the keyword line the reading pass wrote into
//! them, with a summary excerpt as fallback.

// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static KEYWORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(?:Keywords[–\-]Tags|Keywords|Tags|Classification|论文分类|关键词|分类)\s*[：:]\s*(.+?)\s*$")
        .expect("valid regex")
});

static SUMMARY_LEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(?:Summary|总结)[：:]\s*(.{1,200})").expect("valid regex"));

/// Extracts a classification digest from a note body.
///
/// Strips HTML, then looks for a keyword/classification header line; falls
/// back to the first 200 characters after a summary header. Returns `None`
/// when the note yields nothing usable, which disqualifies the item from
/// classification.
#[must_use]
pub fn extract_note_digest(note_html: &str) -> Option<String> {
    let text = HTML_TAG.replace_all(note_html, " ");

    if let Some(captures) = KEYWORD_LINE.captures(&text) {
        let digest = captures.get(1).map(|m| m.as_str().trim().to_string());
        if let Some(d) = digest
            && !d.is_empty()
        {
            return Some(d);
        }
    }

    if let Some(captures) = SUMMARY_LEAD.captures(&text) {
        let digest = captures
            .get(1)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));
        if let Some(d) = digest
            && !d.is_empty()
        {
            return Some(d);
        }
    }

    None
}
