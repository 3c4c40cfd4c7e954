use axum::extract::State;
use axum::Json;

use crate::provider::ProviderEntry;
use crate::server::state::AppState;

/// GET /api/providers - Configured provider/model pairs.
pub async fn handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers: Vec<ProviderEntry> = state.service.providers().entries();
    Json(serde_json::json!({ "providers": providers }))
}
