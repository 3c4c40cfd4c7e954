pub mod router;
pub mod state;

use std::sync::Arc;

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::history::{HistoryStore, MemoryHistoryStore};
use crate::provider;
use crate::service::ChatService;

/// Wire the service graph for a configuration.
pub fn app_state(config: ChatConfig) -> state::AppState {
    let config = Arc::new(config);
    let providers = Arc::new(provider::default_providers(config.providers.clone()));
    tracing::info!(
        providers = ?providers.list_names(),
        models = providers.entries().len(),
        "Initialized providers"
    );

    let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());
    let service = Arc::new(ChatService::new(config, providers, history));
    state::AppState::new(service)
}

/// Start the HTTP server with the given configuration.
pub async fn start(config: ChatConfig) -> Result<()> {
    let bind_addr = config.bind_address();
    let app = router::build(app_state(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| ChatError::Server(format!("Failed to bind to {bind_addr}: {e}")))?;

    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ChatError::Server(format!("Server error: {e}")))?;

    Ok(())
}
