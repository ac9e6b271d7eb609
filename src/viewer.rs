//! Full-text viewer for the original summary HTML.
//!
//! Uses scraper to turn the summary fragment into readable paragraphs.

use crate::summary::Summary;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

const BLOCKS: [&str; 8] = ["p", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

lazy_static! {
    static ref BLOCK_SELECTOR: Selector =
        Selector::parse(&BLOCKS.join(", ")).expect("valid block selector");
}

/// Original summary text prepared for reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalText {
    pub title: String,
    pub description: String,
    pub paragraphs: Vec<String>,
}

/// Open the viewer for a summary. Unavailable when the summary has no text.
pub fn original_text(summary: &Summary) -> Option<OriginalText> {
    let html = summary.text.as_deref().filter(|t| !t.is_empty())?;

    Some(OriginalText {
        title: format!("Original Text: {}", summary.heading()),
        description: format!(
            "Full original text for the summary from {}.",
            summary.formatted_date()
        ),
        paragraphs: extract_paragraphs(html),
    })
}

/// Extract block-level text from an HTML fragment, one entry per block
fn extract_paragraphs(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);

    let paragraphs: Vec<String> = fragment
        .select(&BLOCK_SELECTOR)
        .filter(|element| !inside_block(element))
        .map(|element| collapse(element.text()))
        .filter(|text| !text.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return paragraphs;
    }

    // No block markup: treat the whole fragment as one paragraph
    let text = collapse(fragment.root_element().text());
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text]
    }
}

/// Nested blocks are already covered by their outer block
fn inside_block(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BLOCKS.contains(&ancestor.value().name()))
}

fn collapse<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
