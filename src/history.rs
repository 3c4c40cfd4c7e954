//! Conversation history store
//!
//! The session core only reads ordered turns for a conversation and appends
//! new ones; trimming is the window's job.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::chat::types::HistoryMessage;
use crate::error::Result;

/// Storage for conversation turns, keyed by conversation id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All stored turns for a conversation, oldest first.
    async fn load(&self, conversation_id: &str) -> Result<Vec<HistoryMessage>>;

    /// Append one turn to a conversation.
    async fn append(&self, conversation_id: &str, message: HistoryMessage) -> Result<()>;
}

/// In-process history store for single-node deployments and tests.
#[derive(Default)]
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Vec<HistoryMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self, conversation_id: &str) -> Result<Vec<HistoryMessage>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, conversation_id: &str, message: HistoryMessage) -> Result<()> {
        self.conversations
            .write()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Role;

    #[tokio::test]
    async fn test_load_unknown_conversation_is_empty() {
        let store = MemoryHistoryStore::new();
        assert!(store.load("missing").await.unwrap().is_empty());
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_preserves_order_per_conversation() {
        let store = MemoryHistoryStore::new();
        store.append("a", HistoryMessage::user("one")).await.unwrap();
        store.append("b", HistoryMessage::user("other")).await.unwrap();
        store.append("a", HistoryMessage::assistant("two")).await.unwrap();

        let a = store.load("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].content, "one");
        assert_eq!(a[1].role, Role::Assistant);
        assert_eq!(store.conversation_count().await, 2);
    }
}
