//! Chat service: one inbound request to one streaming session.
//!
//! Everything that can be rejected up front (request shape, provider and
//! credentials, template) is checked before the session opens and surfaces
//! as an error from [`ChatService::start`]. Once the session is open every
//! failure is turned into the session's terminal chunk.

use std::sync::Arc;

use futures::StreamExt;

use crate::chat::types::{ChatRequest, HistoryMessage};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::history::HistoryStore;
use crate::prompt;
use crate::provider::{GenerationEvent, GenerationRequest, ModelProvider, ProviderRegistry};
use crate::session::{ChunkStream, StreamingSession};
use crate::window::ConversationWindow;

pub struct ChatService {
    config: Arc<ChatConfig>,
    providers: Arc<ProviderRegistry>,
    history: Arc<dyn HistoryStore>,
    window: ConversationWindow,
}

impl ChatService {
    pub fn new(
        config: Arc<ChatConfig>,
        providers: Arc<ProviderRegistry>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let window = ConversationWindow::new(config.window);
        Self {
            config,
            providers,
            history,
            window,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Validate, build the prompt, open a session and start generation.
    ///
    /// Returns as soon as the worker is scheduled.
    pub async fn start(&self, request: ChatRequest) -> Result<(StreamingSession, ChunkStream)> {
        request.validate()?;
        let resolved = self.providers.resolve(&request)?;
        let prompt = prompt::build_for_request(&request)?;

        let history = self.history.load(&request.conversation_id).await?;
        let context = self.window.trim_for_model(&history).to_vec();

        let generation = GenerationRequest {
            provider: resolved.settings.provider.clone(),
            model: resolved.settings.model_name.clone(),
            prompt,
            history: context,
        };

        let (session, stream) = StreamingSession::open(&self.config.session);
        tracing::info!(
            session_id = %session.id(),
            conversation_id = %request.conversation_id,
            provider = %generation.provider,
            model = %generation.model,
            context = generation.history.len(),
            "Starting generation"
        );

        let store = self.history.clone();
        let provider = resolved.provider;
        let ChatRequest {
            conversation_id,
            message,
            ..
        } = request;

        session.run(move |session| {
            generate(session, provider, generation, store, conversation_id, message)
        });

        Ok((session, stream))
    }

    /// Stored turns of a conversation, trimmed for client replay.
    pub async fn replay(&self, conversation_id: &str) -> Result<Vec<HistoryMessage>> {
        let history = self.history.load(conversation_id).await?;
        Ok(self.window.trim_for_replay(&history).to_vec())
    }
}

/// Session worker: record the user turn, stream the provider's deltas, record
/// the reply and complete with the reported usage.
async fn generate(
    session: StreamingSession,
    provider: Arc<dyn ModelProvider>,
    generation: GenerationRequest,
    store: Arc<dyn HistoryStore>,
    conversation_id: String,
    message: String,
) -> Result<()> {
    store
        .append(&conversation_id, HistoryMessage::user(message))
        .await?;

    let mut events = provider.generate(generation).await?;
    let mut reply = String::new();
    let mut usage = None;
    while let Some(event) = events.next().await {
        match event? {
            GenerationEvent::Delta(text) => {
                reply.push_str(&text);
                session.send_text(text).await?;
            }
            GenerationEvent::Usage(tokens) => {
                usage = Some(tokens);
                break;
            }
        }
    }

    let used_token = usage.ok_or_else(|| {
        ChatError::Generation("provider stream ended without a usage count".to_string())
    })?;
    store
        .append(&conversation_id, HistoryMessage::assistant(reply))
        .await?;
    // Undelivered completions are logged and recorded by the session.
    let _ = session.complete(used_token).await;
    Ok(())
}
