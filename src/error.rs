//! Error types for a3s-chat

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Provider credential that must be configured before a session can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    ApiKey,
    BaseUrl,
    SecretKey,
}

impl Credential {
    /// Stable numeric code reported to clients.
    pub fn code(&self) -> u32 {
        match self {
            Credential::ApiKey => 1000,
            Credential::BaseUrl => 1003,
            Credential::SecretKey => 1005,
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey => write!(f, "api key"),
            Credential::BaseUrl => write!(f, "base url"),
            Credential::SecretKey => write!(f, "secret key"),
        }
    }
}

/// Errors that can occur while brokering a chat session
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider credential required by the selected model is empty
    #[error("Model {model} ({provider}) {kind} is empty, check the configuration")]
    MissingCredential {
        kind: Credential,
        provider: String,
        model: String,
    },

    /// No provider registered under the requested name
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Malformed inbound chat request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed prompt template or unresolved placeholder
    #[error("Template error: {0}")]
    Template(String),

    /// Failure raised by the model provider or the worker after a session opened
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The client side of the output channel is gone
    #[error("Output channel closed by client")]
    ChannelClosed,

    /// The session deadline elapsed without a terminal transition
    #[error("Session timed out after {0:?}")]
    Timeout(Duration),

    /// Write attempted after the session reached a terminal state
    #[error("Session already closed")]
    AlreadyClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl ChatError {
    /// Numeric error code, present only for credential errors.
    pub fn code(&self) -> Option<u32> {
        match self {
            ChatError::MissingCredential { kind, .. } => Some(kind.code()),
            _ => None,
        }
    }

    /// Errors the client caused or can fix by changing its request or config.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChatError::Config(_)
                | ChatError::MissingCredential { .. }
                | ChatError::ProviderNotFound(_)
                | ChatError::InvalidRequest(_)
                | ChatError::Template(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

impl From<ChatError> for axum::response::Response {
    fn from(err: ChatError) -> Self {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let status = match &err {
            ChatError::InvalidRequest(_) | ChatError::Template(_) => StatusCode::BAD_REQUEST,
            ChatError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Config(_) | ChatError::MissingCredential { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": err.to_string(), "code": err.code() });
        (status, axum::Json(body)).into_response()
    }
}

impl axum::response::IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        self.into()
    }
}
