use std::sync::Arc;

use crate::service::ChatService;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

impl AppState {
    pub fn new(service: Arc<ChatService>) -> Self {
        Self { service }
    }
}
