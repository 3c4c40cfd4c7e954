use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{ChatError, Result};
use crate::prompt::PromptPreset;

/// Prefix marking an error payload in a chunk's `message` field.
pub const ERROR_PREFIX: &str = "Error: ";

// ============================================================================
// Inbound
// ============================================================================

/// One user turn, as posted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_provider: Option<String>,

    /// User message, must be non-empty
    pub message: String,

    /// Stable across turns of one dialogue; keys the history store
    pub conversation_id: String,

    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Instruction template text
    #[serde(default)]
    pub prompt_text: Option<String>,

    /// Named template parameters (a JSON object)
    #[serde(default)]
    pub params: Option<serde_json::Value>,

    /// Built-in instruction template, used when `prompt_text` is absent
    #[serde(default)]
    pub preset: Option<PromptPreset>,

    #[serde(default)]
    pub docs_name: Option<String>,
    #[serde(default)]
    pub docs_id: Option<String>,
    #[serde(default)]
    pub knowledge_id: Option<String>,
    #[serde(default)]
    pub knowledge_ids: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl ChatRequest {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Reject requests that must never open a session.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(ChatError::InvalidRequest("message is empty".to_string()));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(ChatError::InvalidRequest(
                "conversationId is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// One unit written to the client.
///
/// Wire form: `{isDone, message?, usedToken?, time?}`. `usedToken` and `time`
/// only appear on the terminal success chunk; error chunks carry their text in
/// `message` behind [`ERROR_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseChunk {
    #[serde(default)]
    pub is_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_token: Option<u32>,
    /// Milliseconds since session start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl ChatResponseChunk {
    /// A text fragment.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            is_done: false,
            message: Some(text.into()),
            used_token: None,
            time: None,
        }
    }

    /// Terminal success chunk; `time` is measured from `started_at`.
    pub fn done(used_token: u32, started_at: Instant) -> Self {
        Self {
            is_done: true,
            message: None,
            used_token: Some(used_token),
            time: Some(started_at.elapsed().as_millis() as u64),
        }
    }

    /// Terminal error chunk.
    pub fn error(message: impl AsRef<str>) -> Self {
        Self {
            is_done: true,
            message: Some(format!("{ERROR_PREFIX}{}", message.as_ref())),
            used_token: None,
            time: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_done
            && self
                .message
                .as_deref()
                .is_some_and(|m| m.starts_with(ERROR_PREFIX))
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One stored turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
