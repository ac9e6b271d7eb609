//! Client for the internal congress data API.
//!
//! The app proxies api.congress.gov under `/api/congress/...`. Any failure to
//! get a record, whether transport, status or decoding, is logged and reported
//! as "no data" so callers can show a not-found page.

use crate::cache::ResponseCache;
use crate::config::DataConfig;
use crate::summary::Summary;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("billscope/", env!("CARGO_PKG_VERSION"));

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum CongressError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("data API returned {0}")]
    Status(StatusCode),
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// One term of service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub chamber: String,
    pub start_year: u32,
    #[serde(default)]
    pub end_year: Option<u32>,
}

/// Member of Congress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub bioguide_id: String,
    pub name: String,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<u32>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAction {
    pub action_date: String,
    pub text: String,
}

/// A bill or resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub congress: u32,
    #[serde(rename = "type")]
    pub bill_type: String,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub latest_action: Option<LatestAction>,
}

impl Bill {
    /// Short citation, e.g. "HR 1234 (118th)"
    pub fn citation(&self) -> String {
        format!(
            "{} {} ({})",
            self.bill_type.to_uppercase(),
            self.number,
            ordinal(self.congress)
        )
    }
}

/// Summaries arrive either bare or wrapped, depending on the proxy version
#[derive(Deserialize)]
#[serde(untagged)]
enum SummariesPayload {
    Wrapped { summaries: Vec<Summary> },
    Bare(Vec<Summary>),
}

impl From<SummariesPayload> for Vec<Summary> {
    fn from(payload: SummariesPayload) -> Self {
        match payload {
            SummariesPayload::Wrapped { summaries } => summaries,
            SummariesPayload::Bare(summaries) => summaries,
        }
    }
}

/// Typed access to `/api/congress/...` with an optional response cache.
pub struct CongressApi {
    client: Client,
    base_url: String,
    revalidate: Duration,
    cache: Option<ResponseCache>,
}

impl CongressApi {
    pub fn new(config: &DataConfig, cache: Option<ResponseCache>) -> Result<Self, CongressError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            revalidate: config.revalidate_after(),
            cache,
        })
    }

    /// Fetch a member by bioguide id
    pub async fn member(&self, bioguide_id: &str) -> Option<Member> {
        let id = self.checked(bioguide_id)?;
        self.fetch(&format!("member/{id}")).await
    }

    /// Fetch a bill, e.g. `bill(118, "hr", "1234")`
    pub async fn bill(&self, congress: u32, bill_type: &str, number: &str) -> Option<Bill> {
        let path = self.bill_path(congress, bill_type, number)?;
        self.fetch(&path).await
    }

    /// Fetch every summary version of a bill
    pub async fn summaries(
        &self,
        congress: u32,
        bill_type: &str,
        number: &str,
    ) -> Option<Vec<Summary>> {
        let path = self.bill_path(congress, bill_type, number)?;
        self.fetch::<SummariesPayload>(&format!("{path}/summaries"))
            .await
            .map(Vec::from)
    }

    fn bill_path(&self, congress: u32, bill_type: &str, number: &str) -> Option<String> {
        let bill_type = self.checked(&bill_type.to_lowercase())?;
        let number = self.checked(number)?;
        Some(format!("bill/{congress}/{bill_type}/{number}"))
    }

    /// Validate a path segment, logging and rejecting anything unexpected
    fn checked(&self, segment: &str) -> Option<String> {
        match validate_segment(segment) {
            Ok(segment) => Some(segment.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting request");
                None
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}/api/congress/{}", self.base_url, path);
        match self.try_fetch(&url).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to fetch from internal API");
                None
            }
        }
    }

    async fn try_fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, CongressError> {
        if let Some(body) = self.cached(url) {
            match serde_json::from_value(body) {
                Ok(value) => {
                    tracing::debug!(url, "serving cached response");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(url, error = %e, "ignoring undecodable cache entry"),
            }
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CongressError::Status(status));
        }

        let body: serde_json::Value = response.json().await?;
        let value = T::deserialize(&body)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(url, &body) {
                tracing::warn!(url, error = %e, "failed to cache response");
            }
        }

        Ok(value)
    }

    fn cached(&self, url: &str) -> Option<serde_json::Value> {
        let cache = self.cache.as_ref()?;
        match cache.get_fresh(url, self.revalidate) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

/// Path segments must be plain ASCII alphanumerics
fn validate_segment(segment: &str) -> Result<&str, CongressError> {
    if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(segment)
    } else {
        Err(CongressError::InvalidIdentifier(segment.to_string()))
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
