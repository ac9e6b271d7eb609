//! Text cleaning for raw summary HTML before it is sent to the LLM.
//!
//! Summaries from congress.gov arrive as HTML fragments. The agent only needs
//! the prose, so tags are dropped, a handful of common entities are decoded
//! and whitespace is normalised.

use lazy_static::lazy_static;
use regex::Regex;

/// Cleaned text must be longer than this (in characters) to be worth analysing.
pub const MIN_MEANINGFUL_CHARS: usize = 20;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]*>").expect("valid tag pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Entities decoded by [`clean_markup`], applied in this order.
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Strip tags, decode entities and collapse whitespace.
///
/// Returns `None` only when there was no input at all. An input made purely
/// of markup comes back as `Some("")`.
pub fn clean_markup(raw: Option<&str>) -> Option<String> {
    let raw = raw?;

    let stripped = TAG.replace_all(raw, " ");
    let decoded = ENTITIES
        .iter()
        .fold(stripped.into_owned(), |text, (entity, literal)| {
            text.replace(entity, literal)
        });

    Some(WHITESPACE.replace_all(&decoded, " ").trim().to_string())
}

/// Clean a raw summary and keep it only if it is long enough to be meaningful.
pub fn sanitize(raw: Option<&str>) -> Option<String> {
    clean_markup(raw).filter(|text| is_meaningful(text))
}

/// Whether already-cleaned text clears the length threshold
pub fn is_meaningful(text: &str) -> bool {
    text.chars().count() > MIN_MEANINGFUL_CHARS
}
