use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::sse::sse_response;
use crate::chat::types::ChatRequest;
use crate::server::state::AppState;

/// POST /api/chat - Streamed chat turn.
///
/// Rejected requests get a JSON error; accepted ones get an SSE stream with
/// one event per chunk, closed after the terminal chunk.
pub async fn handler(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let conversation_id = request.conversation_id.clone();

    match state.service.start(request).await {
        Ok((session, stream)) => {
            tracing::debug!(
                session_id = %session.id(),
                conversation_id = %conversation_id,
                "Streaming chat response"
            );
            sse_response(stream).into_response()
        }
        Err(e) => {
            if e.is_rejection() {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Rejected chat request"
                );
            } else {
                tracing::error!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Failed to start chat session"
                );
            }
            e.into_response()
        }
    }
}
