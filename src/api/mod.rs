pub mod chat;
pub mod messages;
pub mod providers;
pub mod sse;

use axum::routing::{get, post};
use axum::Router;

use crate::server::state::AppState;

/// Build the chat API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::handler))
        .route("/chat/messages/:conversation_id", get(messages::handler))
        .route("/providers", get(providers::handler))
}
