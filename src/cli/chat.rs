use futures::StreamExt;

use crate::chat::types::ChatRequest;
use crate::config::ChatConfig;
use crate::error::Result;
use crate::server;

/// Execute the `chat` command: run one session and print its chunks.
pub async fn execute(
    config: ChatConfig,
    message: &str,
    provider: Option<String>,
    model: Option<String>,
    template: Option<String>,
    conversation: &str,
) -> Result<()> {
    let state = server::app_state(config);

    let mut request = ChatRequest::new(conversation, message);
    request.model_provider = provider;
    request.model_name = model;
    request.prompt_text = template;

    let (session, mut stream) = state.service.start(request).await?;
    while let Some(chunk) = stream.next().await {
        println!("{}", serde_json::to_string(&chunk)?);
    }
    tracing::debug!(session_id = %session.id(), state = %session.state(), "Chat finished");

    Ok(())
}
