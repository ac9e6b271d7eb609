//! Summary record - one version of a bill's CRS summary as served by the data API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A legislative summary with its raw HTML text and version metadata.
///
/// `text` is whatever congress.gov returned: it can be missing, empty,
/// markup only, or real prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Raw HTML body of the summary
    #[serde(default)]
    pub text: Option<String>,
    /// Legislative action this summary describes (e.g. "Introduced in House")
    pub action_desc: String,
    /// congress.gov version code (e.g. "00")
    pub version_code: String,
    /// When congress.gov last updated the summary
    pub update_date: DateTime<Utc>,
}

impl Summary {
    /// Create a new summary
    pub fn new(
        text: Option<String>,
        action_desc: String,
        version_code: String,
        update_date: DateTime<Utc>,
    ) -> Self {
        Self {
            text,
            action_desc,
            version_code,
            update_date,
        }
    }

    /// Check if the summary carries any text at all
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Heading used wherever the summary is shown, e.g. "Introduced in House (00)"
    pub fn heading(&self) -> String {
        format!("{} ({})", self.action_desc, self.version_code)
    }

    /// Human readable update date
    pub fn formatted_date(&self) -> String {
        format_date(&self.update_date)
    }
}

/// Format a timestamp the way dates are shown across the app ("March 1, 2023").
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}
