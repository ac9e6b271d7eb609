//! Terminal rendering of members, bills and enriched summaries.

use crate::congress::{Bill, Member};
use crate::enrich::{EnrichmentMode, EnrichmentResult};
use crate::summary::Summary;
use crate::viewer::OriginalText;
use colored::Colorize;
use std::fmt::Write;

pub const LOADING: &str = "Generating analysis...";

/// Render one summary block with the current state of its enrichment
pub fn render_summary(summary: &Summary, result: &EnrichmentResult, mode: EnrichmentMode) -> String {
    let mut out = render_heading(summary);
    out.push_str(&render_enrichment(summary, result, mode));
    out
}

/// Heading line of a summary block: version and update date
pub fn render_heading(summary: &Summary) -> String {
    format!(
        "{}  {}\n",
        summary.heading().bold(),
        summary.formatted_date().dimmed()
    )
}

/// Loading indicator shown under a heading while the model runs
pub fn render_loading() -> String {
    format!("  ⏳ {}\n", LOADING.dimmed())
}

/// Body of a summary block, everything below the heading
pub fn render_enrichment(
    summary: &Summary,
    result: &EnrichmentResult,
    mode: EnrichmentMode,
) -> String {
    let mut out = String::new();
    match result {
        EnrichmentResult::Pending => out.push_str(&render_loading()),
        EnrichmentResult::Failed(failure) => {
            let _ = writeln!(out, "  {}", failure.message.red());
        }
        EnrichmentResult::Ready(enrichment) => {
            let _ = writeln!(out, "\n📄 {}", "AI-generated overview:".italic());
            let _ = writeln!(out, "  {}", enrichment.summary);

            if let (EnrichmentMode::Full, Some(perspectives)) = (mode, &enrichment.perspectives) {
                let _ = writeln!(out, "\n👥 {}", "Political perspectives:".bold());
                let _ = writeln!(out, "  {}", "Democratic".blue().bold());
                write_indented(&mut out, &perspectives.democratic);
                let _ = writeln!(out, "  {}", "Republican".red().bold());
                write_indented(&mut out, &perspectives.republican);
            }
        }
    }

    if summary.has_text() {
        let _ = writeln!(out, "\n  {}", "(use `billscope original` to view the original text)".dimmed());
    }
    out
}

/// Perspective text keeps the model's line breaks
fn write_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "    {}", line);
    }
}

pub fn render_original(original: &OriginalText) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", original.title.bold());
    let _ = writeln!(out, "{}\n", original.description.dimmed());
    for paragraph in &original.paragraphs {
        let _ = writeln!(out, "{}\n", paragraph);
    }
    out
}

pub fn render_member(member: &Member) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", member.name.bold());
    let _ = writeln!(out, "  Bioguide ID: {}", member.bioguide_id);
    if let Some(party) = &member.party_name {
        let _ = writeln!(out, "  Party: {}", party);
    }
    match (&member.state, member.district) {
        (Some(state), Some(district)) => {
            let _ = writeln!(out, "  State: {} (district {})", state, district);
        }
        (Some(state), None) => {
            let _ = writeln!(out, "  State: {}", state);
        }
        _ => {}
    }
    if !member.terms.is_empty() {
        let _ = writeln!(out, "\n🏛️  Terms:");
        for term in &member.terms {
            let end = term
                .end_year
                .map_or_else(|| "present".to_string(), |y| y.to_string());
            let _ = writeln!(out, "  • {} {}–{}", term.chamber, term.start_year, end);
        }
    }
    out
}

pub fn render_bill(bill: &Bill) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", bill.citation().bold());
    let _ = writeln!(out, "  {}", bill.title);
    if let Some(action) = &bill.latest_action {
        let _ = writeln!(out, "  Latest action ({}): {}", action.action_date, action.text);
    }
    out
}
