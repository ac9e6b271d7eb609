//! LLM agent module for bill summaries and political perspectives.
//!
//! Uses rstructor for structured output from LLMs. The orchestrator only sees
//! the [`AiClient`] trait so it can be driven by any backend.

use crate::config::Config;
use async_trait::async_trait;
use lazy_static::lazy_static;
use rstructor::{GeminiClient, GeminiModel, LLMClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
    #[error("configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("LLM client unavailable: {0}")]
    Unavailable(String),
}

/// Political viewpoint a perspective is written from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewpoint {
    Democratic,
    Republican,
}

impl fmt::Display for Viewpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Viewpoint::Democratic => write!(f, "Democratic"),
            Viewpoint::Republican => write!(f, "Republican"),
        }
    }
}

/// Outcome of a generation call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The model produced text
    Text(String),
    /// The call succeeded but returned nothing usable
    Empty,
}

impl Completion {
    /// Classify raw model output, treating blank text as empty
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Completion::Empty
        } else {
            Completion::Text(trimmed.to_string())
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Completion::Text(text) => Some(text),
            Completion::Empty => None,
        }
    }
}

/// Text generation backend used by the enrichment pipeline.
///
/// Implementations may fail (`Err`) or succeed without output
/// (`Ok(Completion::Empty)`); callers handle the two differently.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Produce a plain-language summary of cleaned bill text
    async fn summarize(&self, text: &str) -> Result<Completion, AgentError>;

    /// Produce commentary on cleaned bill text from the given viewpoint
    async fn perspective(&self, text: &str, viewpoint: Viewpoint)
        -> Result<Completion, AgentError>;
}

/// Reply shape requested from the model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Generated {
    /// The generated prose, without markdown
    pub content: String,
}

lazy_static! {
    static ref REPLY_SCHEMA: String =
        serde_json::to_string_pretty(&schemars::schema_for!(Generated))
            .expect("reply schema serializes");
}

const SUMMARY_TASK: &str = "Summarize the following congressional bill summary in two or three short paragraphs for a general audience. Explain what the bill would do and who it would affect.";

/// Gemini-backed [`AiClient`].
pub struct GeminiAgent {
    api_key: String,
    model: String,
    persona: String,
    timeout: Option<Duration>,
}

impl GeminiAgent {
    /// Build an agent from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        if config.agent.provider != "gemini" {
            return Err(AgentError::UnsupportedProvider(
                config.agent.provider.clone(),
            ));
        }
        let api_key = config.api_key()?.to_string();

        Ok(Self {
            api_key,
            model: config.agent.model.clone(),
            persona: config.agent.persona.clone(),
            timeout: config.agent.timeout(),
        })
    }

    async fn generate(&self, task: &str, text: &str) -> Result<Completion, AgentError> {
        let request = self.request(task, text);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => request.await,
        }
    }

    async fn request(&self, task: &str, text: &str) -> Result<Completion, AgentError> {
        let client = GeminiClient::new(self.api_key.as_str())
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?
            .model(parse_gemini_model(&self.model));

        let prompt = build_prompt(&self.persona, task, text);
        tracing::debug!(model = %self.model, chars = text.len(), "sending generation request");

        let result = client
            .generate_with_metadata(&prompt)
            .await
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        parse_reply(&result.text)
    }
}

#[async_trait]
impl AiClient for GeminiAgent {
    async fn summarize(&self, text: &str) -> Result<Completion, AgentError> {
        self.generate(SUMMARY_TASK, text).await
    }

    async fn perspective(
        &self,
        text: &str,
        viewpoint: Viewpoint,
    ) -> Result<Completion, AgentError> {
        self.generate(&perspective_task(viewpoint), text).await
    }
}

/// Stand-in for an agent that could not be built, e.g. when no API key is
/// configured. Every call fails with the reason the agent was unavailable.
pub struct UnavailableAgent {
    reason: String,
}

impl UnavailableAgent {
    pub fn new(error: &AgentError) -> Self {
        Self {
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl AiClient for UnavailableAgent {
    async fn summarize(&self, _text: &str) -> Result<Completion, AgentError> {
        Err(AgentError::Unavailable(self.reason.clone()))
    }

    async fn perspective(
        &self,
        _text: &str,
        _viewpoint: Viewpoint,
    ) -> Result<Completion, AgentError> {
        Err(AgentError::Unavailable(self.reason.clone()))
    }
}

/// Build the configured agent, falling back to [`UnavailableAgent`] so that
/// summaries still render their local fallbacks and per-summary failures.
pub fn client_from_config(config: &Config) -> Arc<dyn AiClient> {
    match GeminiAgent::from_config(config) {
        Ok(agent) => Arc::new(agent),
        Err(e) => {
            tracing::error!(error = %e, "AI client unavailable, generation will fail");
            Arc::new(UnavailableAgent::new(&e))
        }
    }
}

fn perspective_task(viewpoint: Viewpoint) -> String {
    format!(
        "Write a short commentary on the following bill as a typical {viewpoint} member of Congress might see it. \
         Say what they would likely support or oppose and why. \
         This is a simulated viewpoint for voter education, not an endorsement."
    )
}

/// Assemble persona, task, reply schema and source text into one prompt
fn build_prompt(persona: &str, task: &str, text: &str) -> String {
    format!(
        r#"{persona}

{task}

You MUST respond with valid JSON matching this exact schema:
{schema}

Do not include any markdown formatting, code blocks, or explanations. Only output the raw JSON object.

---

{text}"#,
        schema = REPLY_SCHEMA.as_str(),
    )
}

/// Turn a raw model reply into a [`Completion`]
fn parse_reply(raw: &str) -> Result<Completion, AgentError> {
    let cleaned = strip_markdown_json(raw);
    if cleaned.is_empty() {
        return Ok(Completion::Empty);
    }

    let reply: Generated = serde_json::from_str(&cleaned)
        .map_err(|e| AgentError::ParseError(format!("{}: {}", e, cleaned)))?;

    Ok(Completion::from_text(reply.content))
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end_idx) = body.rfind("```") {
            return body[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        other => {
            tracing::warn!(model = other, "unknown Gemini model, using gemini-2.0-flash");
            GeminiModel::Gemini20Flash
        }
    }
}
