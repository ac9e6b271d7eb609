//! Summary enrichment: AI overview plus optional political perspectives.
//!
//! [`enrich`] resolves one summary in one mode. [`EnrichmentSession`] wraps it
//! for a render context that keeps receiving new summaries: every change of
//! input starts a new attempt, and only the newest attempt may publish.
//!
//! Every path that does not reach the model resolves to a fixed sentence so
//! the reader can tell why no real summary is shown.

use crate::agent::{AgentError, AiClient, Completion, Viewpoint};
use crate::sanitize::{clean_markup, is_meaningful};
use crate::summary::Summary;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

pub const NO_SUMMARY_TEXT: &str = "No summary text available to analyze.";
pub const NO_PERSPECTIVE_TEXT: &str = "No text available to analyze.";
pub const NO_MEANINGFUL_SUMMARY: &str = "No meaningful summary text available to analyze.";
pub const NO_MEANINGFUL_PERSPECTIVE: &str = "No meaningful text available to analyze.";
pub const TEXT_TOO_SHORT: &str = "Text too short for analysis.";
pub const SUMMARY_NOT_RETURNED: &str = "Summary generation completed but no result returned.";
pub const DEMOCRATIC_NOT_RETURNED: &str =
    "Democratic perspective analysis completed but no result returned.";
pub const REPUBLICAN_NOT_RETURNED: &str =
    "Republican perspective analysis completed but no result returned.";
pub const GENERATION_FAILED: &str = "Could not generate content.";

/// Which parts of the enrichment to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum EnrichmentMode {
    /// AI summary only
    #[default]
    Basic,
    /// AI summary plus Democratic and Republican perspectives
    Full,
}

impl EnrichmentMode {
    pub fn with_perspectives(self) -> bool {
        self == EnrichmentMode::Full
    }
}

/// The two perspective renderings shown in full mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Perspectives {
    pub democratic: String,
    pub republican: String,
}

impl Perspectives {
    fn both(text: &str) -> Self {
        Self {
            democratic: text.to_string(),
            republican: text.to_string(),
        }
    }
}

/// Displayable enrichment. Every field holds readable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub summary: String,
    /// Present exactly when the enrichment was made in [`EnrichmentMode::Full`]
    pub perspectives: Option<Perspectives>,
}

impl Enrichment {
    /// Same fallback sentence for the summary and, in full mode, both perspectives
    fn fallback(summary: &str, perspectives: &str, mode: EnrichmentMode) -> Self {
        Self {
            summary: summary.to_string(),
            perspectives: mode.with_perspectives().then(|| Perspectives::both(perspectives)),
        }
    }
}

/// Whatever individual calls produced before the attempt was declared failed.
///
/// Kept for diagnostics, never displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Retained {
    pub summary: Option<String>,
    pub democratic: Option<String>,
    pub republican: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentFailure {
    /// User-facing banner, always [`GENERATION_FAILED`]
    pub message: String,
    pub retained: Retained,
}

/// Coarse status of an [`EnrichmentResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrichmentStatus {
    Pending,
    Ready,
    Failed,
}

/// State of one enrichment attempt as seen by the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum EnrichmentResult {
    /// Nothing resolved yet: either no attempt was made or the model is working
    #[default]
    Pending,
    Ready(Enrichment),
    Failed(EnrichmentFailure),
}

impl EnrichmentResult {
    pub fn status(&self) -> EnrichmentStatus {
        match self {
            EnrichmentResult::Pending => EnrichmentStatus::Pending,
            EnrichmentResult::Ready(_) => EnrichmentStatus::Ready,
            EnrichmentResult::Failed(_) => EnrichmentStatus::Failed,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, EnrichmentResult::Pending)
    }

    /// User-facing error banner, if the attempt failed
    pub fn error(&self) -> Option<&str> {
        match self {
            EnrichmentResult::Failed(failure) => Some(&failure.message),
            _ => None,
        }
    }

    /// Visible summary text. A failure shows its banner instead.
    pub fn summary_text(&self) -> Option<&str> {
        match self {
            EnrichmentResult::Pending => None,
            EnrichmentResult::Ready(enrichment) => Some(&enrichment.summary),
            EnrichmentResult::Failed(failure) => Some(&failure.message),
        }
    }

    /// Democratic perspective, only for a ready full-mode enrichment
    pub fn perspective_a(&self) -> Option<&str> {
        self.perspectives().map(|p| p.democratic.as_str())
    }

    /// Republican perspective, only for a ready full-mode enrichment
    pub fn perspective_b(&self) -> Option<&str> {
        self.perspectives().map(|p| p.republican.as_str())
    }

    fn perspectives(&self) -> Option<&Perspectives> {
        match self {
            EnrichmentResult::Ready(enrichment) => enrichment.perspectives.as_ref(),
            _ => None,
        }
    }
}

/// What to do with a summary before any model call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Input was degenerate; the enrichment is already known
    Resolved(Enrichment),
    /// Cleaned text worth sending to the model
    Generate(String),
}

/// Decide locally whether a summary needs the model at all.
pub fn plan(summary: Option<&Summary>, mode: EnrichmentMode) -> Plan {
    let raw = match summary.and_then(|s| s.text.as_deref()) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return Plan::Resolved(Enrichment::fallback(
                NO_SUMMARY_TEXT,
                NO_PERSPECTIVE_TEXT,
                mode,
            ))
        }
    };

    let cleaned = clean_markup(Some(raw)).unwrap_or_default();
    if cleaned.is_empty() {
        return Plan::Resolved(Enrichment::fallback(
            NO_MEANINGFUL_SUMMARY,
            NO_MEANINGFUL_PERSPECTIVE,
            mode,
        ));
    }
    if !is_meaningful(&cleaned) {
        return Plan::Resolved(Enrichment::fallback(TEXT_TOO_SHORT, TEXT_TOO_SHORT, mode));
    }

    Plan::Generate(cleaned)
}

/// Enrich one summary, calling the model only when the text is meaningful.
///
/// Never returns [`EnrichmentResult::Pending`].
pub async fn enrich(
    client: &dyn AiClient,
    summary: Option<&Summary>,
    mode: EnrichmentMode,
) -> EnrichmentResult {
    match plan(summary, mode) {
        Plan::Resolved(enrichment) => EnrichmentResult::Ready(enrichment),
        Plan::Generate(text) => generate(client, &text, mode).await,
    }
}

/// Run the model calls for cleaned text and fold them into a result
async fn generate(client: &dyn AiClient, text: &str, mode: EnrichmentMode) -> EnrichmentResult {
    match mode {
        EnrichmentMode::Basic => match client.summarize(text).await {
            Ok(summary) => EnrichmentResult::Ready(Enrichment {
                summary: or_fallback(summary, SUMMARY_NOT_RETURNED),
                perspectives: None,
            }),
            Err(e) => {
                tracing::error!(error = %e, "Error generating content");
                failed(Retained::default())
            }
        },
        EnrichmentMode::Full => {
            let (summary, democratic, republican) = tokio::join!(
                client.summarize(text),
                client.perspective(text, Viewpoint::Democratic),
                client.perspective(text, Viewpoint::Republican),
            );

            match (summary, democratic, republican) {
                (Ok(summary), Ok(democratic), Ok(republican)) => {
                    EnrichmentResult::Ready(Enrichment {
                        summary: or_fallback(summary, SUMMARY_NOT_RETURNED),
                        perspectives: Some(Perspectives {
                            democratic: or_fallback(democratic, DEMOCRATIC_NOT_RETURNED),
                            republican: or_fallback(republican, REPUBLICAN_NOT_RETURNED),
                        }),
                    })
                }
                (summary, democratic, republican) => {
                    for error in [&summary, &democratic, &republican]
                        .into_iter()
                        .filter_map(|r| r.as_ref().err())
                    {
                        tracing::error!(error = %error, "Error generating content");
                    }
                    failed(Retained {
                        summary: retain(&summary),
                        democratic: retain(&democratic),
                        republican: retain(&republican),
                    })
                }
            }
        }
    }
}

fn or_fallback(completion: Completion, fallback: &str) -> String {
    completion
        .into_text()
        .unwrap_or_else(|| fallback.to_string())
}

fn retain(result: &Result<Completion, AgentError>) -> Option<String> {
    match result {
        Ok(Completion::Text(text)) => Some(text.clone()),
        _ => None,
    }
}

fn failed(retained: Retained) -> EnrichmentResult {
    EnrichmentResult::Failed(EnrichmentFailure {
        message: GENERATION_FAILED.to_string(),
        retained,
    })
}

/// Monotonic identifier of one enrichment trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct AttemptToken(u64);

impl AttemptToken {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        AttemptToken(self.0 + 1)
    }
}

/// What a subscriber sees: the newest attempt and its current result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub attempt: AttemptToken,
    pub result: EnrichmentResult,
    input: Option<(Option<Summary>, EnrichmentMode)>,
}

impl Snapshot {
    /// True once an attempt was started and resolved
    pub fn is_settled(&self) -> bool {
        self.attempt != AttemptToken::default() && !self.result.is_loading()
    }
}

/// Reactive enrichment for one render context.
///
/// Call [`update`](Self::update) whenever the displayed summary or mode
/// changes; observe the outcome through [`subscribe`](Self::subscribe).
/// Results of superseded attempts are dropped, so a slow response for an old
/// summary can never replace a newer one.
pub struct EnrichmentSession {
    client: Arc<dyn AiClient>,
    state: watch::Sender<Snapshot>,
}

impl EnrichmentSession {
    pub fn new(client: Arc<dyn AiClient>) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self { client, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Enrich `summary` in `mode` unless that exact pair is already current.
    ///
    /// Returns the snapshot this call published, or the newer snapshot that
    /// superseded it.
    pub async fn update(&self, summary: Option<Summary>, mode: EnrichmentMode) -> Snapshot {
        let input = (summary, mode);
        let unchanged = self.state.borrow().input.as_ref() == Some(&input);
        if unchanged {
            tracing::debug!("enrichment input unchanged, keeping current result");
            return self.snapshot();
        }

        let next = plan(input.0.as_ref(), mode);
        let text = match next {
            Plan::Resolved(enrichment) => {
                self.begin(input, EnrichmentResult::Ready(enrichment));
                return self.snapshot();
            }
            Plan::Generate(text) => text,
        };

        let token = self.begin(input, EnrichmentResult::Pending);
        tracing::debug!(attempt = token.value(), ?mode, "generating enrichment");
        let result = generate(self.client.as_ref(), &text, mode).await;

        if !self.apply(token, result) {
            tracing::debug!(attempt = token.value(), "discarding stale enrichment result");
        }
        self.snapshot()
    }

    /// Start a new attempt with its first result, `Pending` while the model runs
    fn begin(
        &self,
        input: (Option<Summary>, EnrichmentMode),
        result: EnrichmentResult,
    ) -> AttemptToken {
        let mut token = AttemptToken::default();
        self.state.send_modify(|snapshot| {
            snapshot.attempt = snapshot.attempt.next();
            snapshot.input = Some(input);
            snapshot.result = result;
            token = snapshot.attempt;
        });
        token
    }

    /// Publish `result` if `token` is still the newest attempt
    fn apply(&self, token: AttemptToken, result: EnrichmentResult) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.attempt != token {
                return false;
            }
            snapshot.result = result;
            true
        })
    }
}
