//! Session integration tests
//!
//! Drive full chat turns through `ChatService` with a scripted provider:
//! plain prompts, mid-stream provider errors, usage and timing on the
//! terminal chunk, deadlines, and history bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use a3s_chat::provider::GenerationStream;
use a3s_chat::{
    ChatConfig, ChatError, ChatRequest, ChatResponseChunk, ChatService, GenerationEvent,
    GenerationRequest, HistoryStore, MemoryHistoryStore, ModelProvider, ProviderRegistry,
    ProviderSettings, Result, Role, SessionState,
};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_test::assert_ok;

#[derive(Debug, Clone, Copy)]
enum Step {
    Delta(&'static str),
    Usage(u32),
    Fail(&'static str),
    Sleep(Duration),
    Hang,
}

/// Provider that plays back a fixed script and records the prompts it saw.
struct ScriptedProvider {
    steps: Vec<Step>,
    prompts: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream> {
        self.prompts.lock().await.push(request);
        let events = futures::stream::iter(self.steps.clone()).filter_map(|step| async move {
            match step {
                Step::Delta(text) => Some(Ok(GenerationEvent::Delta(text.to_string()))),
                Step::Usage(tokens) => Some(Ok(GenerationEvent::Usage(tokens))),
                Step::Fail(reason) => Some(Err(ChatError::Generation(reason.to_string()))),
                Step::Sleep(duration) => {
                    tokio::time::sleep(duration).await;
                    None
                }
                Step::Hang => {
                    futures::future::pending::<()>().await;
                    None
                }
            }
        });
        Ok(Box::pin(events))
    }
}

fn config(timeout_ms: u64) -> ChatConfig {
    let mut config = ChatConfig::default();
    config.session.timeout_ms = timeout_ms;
    config.providers = vec![ProviderSettings {
        provider: "scripted".into(),
        model_name: "script-1".into(),
        api_key: Some("test-key".into()),
        ..Default::default()
    }];
    config
}

fn service_with(
    provider: Arc<ScriptedProvider>,
    config: ChatConfig,
    store: Arc<MemoryHistoryStore>,
) -> ChatService {
    let mut registry = ProviderRegistry::new(config.providers.clone());
    registry.register(provider);
    ChatService::new(Arc::new(config), Arc::new(registry), store)
}

fn text_of(chunks: &[ChatResponseChunk]) -> String {
    chunks
        .iter()
        .filter(|c| !c.is_done)
        .filter_map(|c| c.message.clone())
        .collect()
}

// ─── Prompt building ─────────────────────────────────────────────

#[tokio::test]
async fn test_plain_message_reaches_provider_unchanged() {
    let provider = ScriptedProvider::new(vec![Step::Delta("hi"), Step::Usage(1)]);
    let service = service_with(
        provider.clone(),
        config(300_000),
        Arc::new(MemoryHistoryStore::new()),
    );

    let (_session, stream) = assert_ok!(service.start(ChatRequest::new("c1", "hello")).await);
    let _: Vec<_> = stream.collect().await;

    let seen = provider.prompts.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].prompt, "hello");
    assert_eq!(seen[0].model, "script-1");
}

#[tokio::test]
async fn test_template_places_question() {
    let provider = ScriptedProvider::new(vec![Step::Usage(0)]);
    let service = service_with(
        provider.clone(),
        config(300_000),
        Arc::new(MemoryHistoryStore::new()),
    );

    let mut request = ChatRequest::new("c1", "hi");
    request.prompt_text = Some("Answer: {{question}}".into());
    let (_session, stream) = assert_ok!(service.start(request).await);
    let _: Vec<_> = stream.collect().await;

    assert_eq!(provider.prompts.lock().await[0].prompt, "Answer: hi");
}

// ─── Terminal outcomes ───────────────────────────────────────────

#[tokio::test]
async fn test_provider_error_after_two_deltas() {
    let provider = ScriptedProvider::new(vec![
        Step::Delta("Hel"),
        Step::Delta("lo"),
        Step::Fail("rate limited"),
    ]);
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_with(provider, config(300_000), store.clone());

    let (session, stream) = assert_ok!(service.start(ChatRequest::new("c1", "hello")).await);
    let chunks: Vec<_> = stream.collect().await;

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], ChatResponseChunk::delta("Hel"));
    assert_eq!(chunks[1], ChatResponseChunk::delta("lo"));
    assert!(chunks[2].is_error());
    assert_eq!(chunks[2].message.as_deref(), Some("Error: rate limited"));
    assert_eq!(session.state(), SessionState::Failed);

    // Only the user turn is recorded for a failed generation.
    let history = assert_ok!(store.load("c1").await);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test(start_paused = true)]
async fn test_completion_reports_usage_and_elapsed_time() {
    let provider = ScriptedProvider::new(vec![
        Step::Delta("ok"),
        Step::Sleep(Duration::from_millis(150)),
        Step::Usage(42),
    ]);
    let service = service_with(
        provider,
        config(300_000),
        Arc::new(MemoryHistoryStore::new()),
    );

    let (session, stream) = assert_ok!(service.start(ChatRequest::new("c1", "hello")).await);
    let chunks: Vec<_> = stream.collect().await;

    let last = chunks.last().cloned().unwrap();
    assert!(last.is_done);
    assert!(!last.is_error());
    assert_eq!(last.used_token, Some(42));
    assert_eq!(last.time, Some(150));
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_hung_provider_times_out() {
    let provider = ScriptedProvider::new(vec![Step::Delta("partial"), Step::Hang]);
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_with(provider, config(1_000), store.clone());

    let (session, stream) = assert_ok!(service.start(ChatRequest::new("c1", "hello")).await);
    let chunks: Vec<_> = stream.collect().await;

    assert_eq!(text_of(&chunks), "partial");
    let last = chunks.last().unwrap();
    assert!(last.is_error());
    assert!(last.message.as_deref().unwrap().contains("timed out"));
    assert_eq!(chunks.iter().filter(|c| c.is_done).count(), 1);
    assert_eq!(session.state(), SessionState::TimedOut);
}

#[tokio::test]
async fn test_missing_usage_fails_session() {
    let provider = ScriptedProvider::new(vec![Step::Delta("no usage")]);
    let service = service_with(
        provider,
        config(300_000),
        Arc::new(MemoryHistoryStore::new()),
    );

    let (session, stream) = assert_ok!(service.start(ChatRequest::new("c1", "hello")).await);
    let chunks: Vec<_> = stream.collect().await;

    assert!(chunks.last().unwrap().is_error());
    assert_eq!(session.state(), SessionState::Failed);
}

// ─── History ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_turn_sees_first_turn_history() {
    let provider = ScriptedProvider::new(vec![Step::Delta("pong"), Step::Usage(1)]);
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_with(provider.clone(), config(300_000), store.clone());

    for message in ["ping", "again"] {
        let (_session, stream) = assert_ok!(service.start(ChatRequest::new("c1", message)).await);
        let _: Vec<_> = stream.collect().await;
    }

    let seen = provider.prompts.lock().await;
    assert!(seen[0].history.is_empty());
    let contents: Vec<_> = seen[1].history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["ping", "pong"]);

    let replay = assert_ok!(service.replay("c1").await);
    assert_eq!(replay.len(), 4);
    assert_eq!(replay[3].role, Role::Assistant);
}

#[tokio::test]
async fn test_rejected_request_opens_no_session() {
    let provider = ScriptedProvider::new(vec![Step::Usage(0)]);
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_with(provider.clone(), config(300_000), store.clone());

    let mut request = ChatRequest::new("c1", "hello");
    request.model_name = Some("unknown-model".into());
    let err = service.start(request).await.err().unwrap();

    assert!(matches!(err, ChatError::ProviderNotFound(_)));
    assert!(provider.prompts.lock().await.is_empty());
    assert_eq!(store.conversation_count().await, 0);
}
