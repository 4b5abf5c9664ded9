use super::*;
use crate::config::NormalizationPolicy;
use crate::error::SolverError;
use crate::types::Role;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Provider double that records calls and replays a fixed answer
struct RecordingProvider {
    calls: AtomicU64,
    last_turns: Mutex<Vec<ChatTurn>>,
    answer: String,
}

impl RecordingProvider {
    fn new(answer: &str) -> Self {
        RecordingProvider {
            calls: AtomicU64::new(0),
            last_turns: Mutex::new(Vec::new()),
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for RecordingProvider {
    async fn complete(&self, turns: &[ChatTurn]) -> SolverResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_turns.lock().unwrap() = turns.to_vec();
        Ok(self.answer.clone())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Provider double that always reports quota exhaustion
struct QuotaProvider;

#[async_trait]
impl CompletionProvider for QuotaProvider {
    async fn complete(&self, _turns: &[ChatTurn]) -> SolverResult<String> {
        Err(SolverError::UpstreamQuota)
    }

    fn name(&self) -> &'static str {
        "quota"
    }
}

fn service_without_cache(provider: Arc<dyn CompletionProvider>) -> SolverService {
    SolverService::new(Normalizer::new(NormalizationPolicy::Full), provider, None)
}

#[tokio::test]
async fn test_solve_without_cache_goes_upstream() {
    let provider = Arc::new(RecordingProvider::new("the answer is 1"));
    let service = service_without_cache(provider.clone());

    let response = service.solve("a / a").await.unwrap();

    assert_eq!(response.text, "the answer is 1");
    assert_eq!(response.source, ResponseSource::Api);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert!(!service.caching_enabled());
}

#[tokio::test]
async fn test_solve_sends_normalized_payload() {
    let provider = Arc::new(RecordingProvider::new("ok"));
    let service = service_without_cache(provider.clone());

    service.solve("SIN12X").await.unwrap();

    let turns = provider.last_turns.lock().unwrap().clone();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "Solve this math problem in detail: sin^12x");
}

#[tokio::test]
async fn test_solve_raw_policy_sends_untouched_payload() {
    let provider = Arc::new(RecordingProvider::new("ok"));
    let service = SolverService::new(
        Normalizer::new(NormalizationPolicy::Raw),
        provider.clone(),
        None,
    );

    service.solve("SIN12X").await.unwrap();

    let turns = provider.last_turns.lock().unwrap().clone();
    assert_eq!(turns[0].text, "Solve this math problem in detail: SIN12X");
}

#[tokio::test]
async fn test_solve_propagates_upstream_quota() {
    let service = service_without_cache(Arc::new(QuotaProvider));

    let result = service.solve("x^2").await;

    assert!(matches!(result, Err(SolverError::UpstreamQuota)));
}

#[tokio::test]
async fn test_chat_appends_message_to_history() {
    let provider = Arc::new(RecordingProvider::new("hello again"));
    let service = service_without_cache(provider.clone());

    let history = vec![
        ChatTurn::user("what is 2+2?"),
        ChatTurn::model("2+2 equals 4."),
    ];
    let response = service.chat("and 3+3?", &history).await.unwrap();

    assert_eq!(response.text, "hello again");

    let turns = provider.last_turns.lock().unwrap().clone();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].text, "what is 2+2?");
    assert_eq!(turns[1].role, Role::Model);
    assert_eq!(turns[2].text, "and 3+3?");
}

#[tokio::test]
async fn test_chat_is_not_normalized() {
    let provider = Arc::new(RecordingProvider::new("ok"));
    let service = service_without_cache(provider.clone());

    service.chat("What is SIN( X )?", &[]).await.unwrap();

    let turns = provider.last_turns.lock().unwrap().clone();
    assert_eq!(turns[0].text, "What is SIN( X )?");
}

#[tokio::test]
async fn test_health_check_without_cache() {
    let service = service_without_cache(Arc::new(RecordingProvider::new("ok")));
    assert!(service.health_check().await.is_ok());
}
