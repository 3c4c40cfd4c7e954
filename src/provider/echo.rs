// Echo provider.
//
// Streams the prompt back word by word and reports one token per word. It
// needs no credentials, which makes it the default local provider and the
// reference behaviour for tests of the session plumbing.

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::Result;

use super::{GenerationEvent, GenerationRequest, GenerationStream, ModelProvider};

#[derive(Debug, Default)]
pub struct EchoProvider;

impl EchoProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream> {
        tracing::debug!(
            model = %request.model,
            history = request.history.len(),
            "Echoing prompt"
        );

        let words: Vec<String> = request
            .prompt
            .split_inclusive(char::is_whitespace)
            .map(str::to_string)
            .collect();
        let usage = words.len() as u32;

        let deltas = futures::stream::iter(words).map(|word| Ok(GenerationEvent::Delta(word)));
        let done = futures::stream::once(async move { Ok(GenerationEvent::Usage(usage)) });

        Ok(Box::pin(deltas.chain(done)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            provider: "echo".into(),
            model: "echo".into(),
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_echo_streams_words_then_usage() {
        let provider = EchoProvider::new();
        let events: Vec<GenerationEvent> = provider
            .generate(request("hello big world"))
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                GenerationEvent::Delta("hello ".into()),
                GenerationEvent::Delta("big ".into()),
                GenerationEvent::Delta("world".into()),
                GenerationEvent::Usage(3),
            ]
        );
    }

    #[tokio::test]
    async fn test_echo_empty_prompt() {
        let events: Vec<_> = EchoProvider::new()
            .generate(request(""))
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(GenerationEvent::Usage(0))));
    }
}
