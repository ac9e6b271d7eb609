use async_trait::async_trait;
use billscope::agent::AgentError;
use billscope::enrich::{
    EnrichmentStatus, DEMOCRATIC_NOT_RETURNED, GENERATION_FAILED, NO_MEANINGFUL_SUMMARY,
    NO_PERSPECTIVE_TEXT, NO_SUMMARY_TEXT, REPUBLICAN_NOT_RETURNED, SUMMARY_NOT_RETURNED,
    TEXT_TOO_SHORT,
};
use billscope::{
    enrich, AiClient, Completion, EnrichmentMode, EnrichmentResult, EnrichmentSession, Summary,
    Viewpoint,
};
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Barrier, Notify};

const BILL_TEXT: &str = "<p><strong>Rural Broadband Expansion Act</strong></p><p>This bill directs the FCC to award grants for broadband in rural areas.</p>";

#[derive(Clone, Copy)]
enum Reply {
    Text(&'static str),
    Empty,
    Fail,
}

impl Reply {
    fn resolve(self) -> Result<Completion, AgentError> {
        match self {
            Reply::Text(text) => Ok(Completion::from_text(text)),
            Reply::Empty => Ok(Completion::Empty),
            Reply::Fail => Err(AgentError::RequestFailed("service unavailable".to_string())),
        }
    }
}

/// Scripted client recording every call it receives
struct ScriptedClient {
    summary: Reply,
    democratic: Reply,
    republican: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(summary: Reply, democratic: Reply, republican: Reply) -> Self {
        Self {
            summary,
            democratic,
            republican,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn succeeding() -> Self {
        Self::new(
            Reply::Text("An overview."),
            Reply::Text("Democrats would support it."),
            Reply::Text("Republicans would question the cost."),
        )
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiClient for ScriptedClient {
    async fn summarize(&self, text: &str) -> Result<Completion, AgentError> {
        self.calls.lock().unwrap().push(format!("summarize:{text}"));
        self.summary.resolve()
    }

    async fn perspective(&self, text: &str, viewpoint: Viewpoint) -> Result<Completion, AgentError> {
        self.calls.lock().unwrap().push(format!("{viewpoint}:{text}"));
        match viewpoint {
            Viewpoint::Democratic => self.democratic.resolve(),
            Viewpoint::Republican => self.republican.resolve(),
        }
    }
}

fn summary(text: Option<&str>) -> Summary {
    Summary::new(
        text.map(str::to_string),
        "Introduced in House".to_string(),
        "00".to_string(),
        Utc.with_ymd_and_hms(2023, 3, 1, 14, 35, 46).unwrap(),
    )
}

#[tokio::test]
async fn null_text_never_calls_the_model() {
    let client = ScriptedClient::succeeding();

    let result = enrich(&client, Some(&summary(None)), EnrichmentMode::Full).await;

    assert_eq!(result.status(), EnrichmentStatus::Ready);
    assert_eq!(result.summary_text(), Some(NO_SUMMARY_TEXT));
    assert_eq!(result.perspective_a(), Some(NO_PERSPECTIVE_TEXT));
    assert_eq!(result.perspective_b(), Some(NO_PERSPECTIVE_TEXT));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn missing_summary_behaves_like_null_text() {
    let client = ScriptedClient::succeeding();
    let result = enrich(&client, None, EnrichmentMode::Basic).await;
    assert_eq!(result.summary_text(), Some(NO_SUMMARY_TEXT));
    assert_eq!(result.perspective_a(), None);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn markup_only_text_is_not_meaningful() {
    let client = ScriptedClient::succeeding();
    let result = enrich(&client, Some(&summary(Some("<p><br/></p>"))), EnrichmentMode::Basic).await;
    assert_eq!(result.summary_text(), Some(NO_MEANINGFUL_SUMMARY));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn short_text_is_too_short_for_analysis() {
    let client = ScriptedClient::succeeding();

    let result = enrich(&client, Some(&summary(Some("<i>Short.</i>"))), EnrichmentMode::Full).await;

    assert_eq!(result.status(), EnrichmentStatus::Ready);
    assert_eq!(result.summary_text(), Some(TEXT_TOO_SHORT));
    assert_eq!(result.perspective_a(), Some(TEXT_TOO_SHORT));
    assert_eq!(result.perspective_b(), Some(TEXT_TOO_SHORT));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn basic_mode_makes_exactly_one_call_with_cleaned_text() {
    let client = ScriptedClient::succeeding();

    let result = enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Basic).await;

    assert_eq!(result.summary_text(), Some("An overview."));
    assert_eq!(result.perspective_a(), None);
    assert_eq!(
        client.calls(),
        vec!["summarize:Rural Broadband Expansion Act This bill directs the FCC to award grants for broadband in rural areas."]
    );
}

#[tokio::test]
async fn full_mode_makes_three_calls() {
    let client = ScriptedClient::succeeding();

    let result = enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;

    assert_eq!(result.summary_text(), Some("An overview."));
    assert_eq!(result.perspective_a(), Some("Democrats would support it."));
    assert_eq!(result.perspective_b(), Some("Republicans would question the cost."));
    assert_eq!(client.calls().len(), 3);
}

#[tokio::test]
async fn one_failing_call_fails_the_whole_enrichment() {
    let client = ScriptedClient::new(
        Reply::Text("An overview."),
        Reply::Fail,
        Reply::Text("Republicans would question the cost."),
    );

    let result = enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;

    assert_eq!(result.status(), EnrichmentStatus::Failed);
    assert_eq!(result.error(), Some(GENERATION_FAILED));
    assert_eq!(result.summary_text(), Some(GENERATION_FAILED));
    assert_eq!(result.perspective_a(), None);
    assert_eq!(result.perspective_b(), None);
    // every call still ran to completion
    assert_eq!(client.calls().len(), 3);

    let EnrichmentResult::Failed(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.retained.summary.as_deref(), Some("An overview."));
    assert_eq!(failure.retained.democratic, None);
}

#[tokio::test]
async fn basic_mode_failure() {
    let client = ScriptedClient::new(Reply::Fail, Reply::Empty, Reply::Empty);
    let result = enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Basic).await;
    assert_eq!(result.error(), Some(GENERATION_FAILED));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn empty_replies_get_their_own_fallbacks() {
    let client = ScriptedClient::new(Reply::Empty, Reply::Empty, Reply::Text("   "));

    let result = enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;

    assert_eq!(result.status(), EnrichmentStatus::Ready);
    assert_eq!(result.summary_text(), Some(SUMMARY_NOT_RETURNED));
    assert_eq!(result.perspective_a(), Some(DEMOCRATIC_NOT_RETURNED));
    assert_eq!(result.perspective_b(), Some(REPUBLICAN_NOT_RETURNED));
}

/// Each call waits until all three are in flight
struct RendezvousClient {
    barrier: Barrier,
}

#[async_trait]
impl AiClient for RendezvousClient {
    async fn summarize(&self, _text: &str) -> Result<Completion, AgentError> {
        self.barrier.wait().await;
        Ok(Completion::from_text("overview"))
    }

    async fn perspective(&self, _text: &str, viewpoint: Viewpoint) -> Result<Completion, AgentError> {
        self.barrier.wait().await;
        Ok(Completion::from_text(viewpoint.to_string()))
    }
}

#[tokio::test]
async fn full_mode_calls_run_concurrently() {
    let client = RendezvousClient {
        barrier: Barrier::new(3),
    };

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        enrich(&client, Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Full),
    )
    .await
    .expect("calls were serialized");

    assert_eq!(result.perspective_a(), Some("Democratic"));
    assert_eq!(result.perspective_b(), Some("Republican"));
}

#[tokio::test]
async fn unchanged_input_keeps_the_current_result() {
    let client = Arc::new(ScriptedClient::succeeding());
    let session = EnrichmentSession::new(client.clone());

    let first = session.update(Some(summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;
    let second = session.update(Some(summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;

    assert_eq!(first, second);
    assert_eq!(first.attempt.value(), 1);
    assert_eq!(client.calls().len(), 3);

    // a fresh computation of the same pair is equal too
    let again = enrich(client.as_ref(), Some(&summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;
    assert_eq!(again, first.result);
}

#[tokio::test]
async fn mode_toggle_starts_a_new_attempt() {
    let client = Arc::new(ScriptedClient::succeeding());
    let session = EnrichmentSession::new(client.clone());

    session.update(Some(summary(Some(BILL_TEXT))), EnrichmentMode::Basic).await;
    let full = session.update(Some(summary(Some(BILL_TEXT))), EnrichmentMode::Full).await;

    assert_eq!(full.attempt.value(), 2);
    assert_eq!(full.result.perspective_a(), Some("Democrats would support it."));
    assert_eq!(client.calls().len(), 4);
}

/// Holds the reply for any text mentioning "first" until released
struct GatedClient {
    started: Notify,
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl AiClient for GatedClient {
    async fn summarize(&self, text: &str) -> Result<Completion, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("first") {
            self.started.notify_one();
            self.release.notified().await;
            return Ok(Completion::from_text("overview of the first summary"));
        }
        Ok(Completion::from_text("overview of the second summary"))
    }

    async fn perspective(&self, _text: &str, _viewpoint: Viewpoint) -> Result<Completion, AgentError> {
        Ok(Completion::Empty)
    }
}

#[tokio::test]
async fn late_results_of_superseded_attempts_are_dropped() {
    let client = Arc::new(GatedClient {
        started: Notify::new(),
        release: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let session = Arc::new(EnrichmentSession::new(client.clone()));
    let mut updates = session.subscribe();

    let slow = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .update(
                    Some(summary(Some("<p>The first version of this bill summary.</p>"))),
                    EnrichmentMode::Basic,
                )
                .await
        })
    };
    client.started.notified().await;
    assert!(session.snapshot().result.is_loading());

    let fast = session
        .update(
            Some(summary(Some("<p>The second version of this bill summary.</p>"))),
            EnrichmentMode::Basic,
        )
        .await;
    assert_eq!(fast.attempt.value(), 2);
    assert_eq!(fast.result.summary_text(), Some("overview of the second summary"));

    client.release.notify_one();
    let stale = slow.await.unwrap();

    // the slow attempt reports the newer state instead of its own
    assert_eq!(stale.attempt.value(), 2);
    assert_eq!(
        session.snapshot().result.summary_text(),
        Some("overview of the second summary")
    );
    assert_eq!(
        updates.borrow_and_update().result.summary_text(),
        Some("overview of the second summary")
    );
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn subscribers_see_loading_then_ready() {
    let client = Arc::new(ScriptedClient::succeeding());
    let session = EnrichmentSession::new(client);
    let updates = session.subscribe();

    assert!(!updates.borrow().is_settled());
    session.update(Some(summary(Some(BILL_TEXT))), EnrichmentMode::Basic).await;

    let snapshot = updates.borrow().clone();
    assert!(snapshot.is_settled());
    assert!(!snapshot.result.is_loading());
    assert_eq!(snapshot.result.error(), None);
}

#[tokio::test]
async fn absent_summary_still_reacts_to_mode() {
    let client = Arc::new(ScriptedClient::succeeding());
    let session = EnrichmentSession::new(client.clone());

    let basic = session.update(None, EnrichmentMode::Basic).await;
    assert_eq!(basic.result.perspective_a(), None);

    let full = session.update(None, EnrichmentMode::Full).await;
    assert_eq!(full.attempt.value(), 2);
    assert_eq!(full.result.perspective_a(), Some(NO_PERSPECTIVE_TEXT));
    assert!(client.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locally_resolved_summaries_never_show_loading() {
    let client = Arc::new(ScriptedClient::succeeding());
    let session = EnrichmentSession::new(client.clone());
    let mut updates = session.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            seen.push(snapshot.result.status());
            if snapshot.attempt.value() == 3 {
                break;
            }
        }
        seen
    });

    for text in [None, Some("<p><br/></p>"), Some("<i>Short.</i>")] {
        let snapshot = session.update(Some(summary(text)), EnrichmentMode::Full).await;
        assert_eq!(snapshot.result.status(), EnrichmentStatus::Ready);
    }

    let seen = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .unwrap()
        .unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|status| *status == EnrichmentStatus::Ready));
    assert!(client.calls().is_empty());
}
