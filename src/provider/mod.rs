//! Model provider trait, the seam to the LLM backends
//!
//! The session core never talks to a provider API directly. A provider takes
//! a built prompt plus model selection and history, and hands back a stream
//! of text deltas ending in a usage count, or an error.

pub mod echo;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::chat::types::{ChatRequest, HistoryMessage};
use crate::config::ProviderSettings;
use crate::error::{ChatError, Result};

/// Everything a provider needs for one generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub provider: String,
    pub model: String,
    pub prompt: String,
    /// Prior turns, already trimmed to the model window
    pub history: Vec<HistoryMessage>,
}

/// One event from a provider's response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Text fragment
    Delta(String),
    /// Final token usage; ends the stream
    Usage(u32),
}

pub type GenerationStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent>> + Send>>;

/// Trait for model providers that stream generations.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider family this implementation serves (e.g. "echo", "openai").
    fn name(&self) -> &str;

    /// Start a generation, returning its event stream.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream>;
}

/// A configured provider/model pair, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    pub provider: String,
    pub model_name: String,
}

/// Provider implementation resolved for a request, with its validated settings.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub provider: Arc<dyn ModelProvider>,
    pub settings: ProviderSettings,
}

/// Registry of provider implementations and configured models.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ModelProvider>>,
    settings: Vec<ProviderSettings>,
}

impl ProviderRegistry {
    pub fn new(settings: Vec<ProviderSettings>) -> Self {
        Self {
            providers: HashMap::new(),
            settings,
        }
    }

    /// Register a provider implementation under its family name.
    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) {
        self.providers
            .insert(provider.name().to_ascii_lowercase(), provider);
    }

    /// Pick provider and model for a request and check credentials.
    ///
    /// Without an explicit provider the first configured entry is used.
    pub fn resolve(&self, request: &ChatRequest) -> Result<ResolvedProvider> {
        let wanted_provider = request.model_provider.as_deref();
        let wanted_model = request.model_name.as_deref();

        let settings = self
            .settings
            .iter()
            .find(|s| {
                wanted_provider.map_or(true, |p| s.provider.eq_ignore_ascii_case(p))
                    && wanted_model.map_or(true, |m| s.model_name == m)
            })
            .ok_or_else(|| {
                ChatError::ProviderNotFound(format!(
                    "{}/{}",
                    wanted_provider.unwrap_or("*"),
                    wanted_model.unwrap_or("*")
                ))
            })?;

        settings.validate()?;

        let provider = self
            .providers
            .get(&settings.provider.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                ChatError::Config(format!(
                    "No implementation registered for provider: {}",
                    settings.provider
                ))
            })?;

        Ok(ResolvedProvider {
            provider,
            settings: settings.clone(),
        })
    }

    /// Configured provider/model pairs.
    pub fn entries(&self) -> Vec<ProviderEntry> {
        self.settings
            .iter()
            .map(|s| ProviderEntry {
                provider: s.provider.clone(),
                model_name: s.model_name.clone(),
            })
            .collect()
    }

    /// Registered implementation names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.values().map(|p| p.name()).collect();
        names.sort_unstable();
        names
    }
}

/// Create a `ProviderRegistry` with the built-in providers registered.
pub fn default_providers(settings: Vec<ProviderSettings>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(settings);
    registry.register(Arc::new(echo::EchoProvider::new()));
    registry
}
