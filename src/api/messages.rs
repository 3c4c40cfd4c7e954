use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::server::state::AppState;

/// GET /api/chat/messages/:conversation_id - History for client replay.
pub async fn handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.service.replay(&conversation_id).await {
        Ok(messages) => Json(serde_json::json!({ "messages": messages })).into_response(),
        Err(e) => e.into_response(),
    }
}
