//! Conversation window: how much prior dialogue is kept.
//!
//! Two independent bounds apply to the same history: a small one for the
//! context sent to the model and a larger one for client-side replay.

use serde::{Deserialize, Serialize};

/// Bounds on retained conversation turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationWindowConfig {
    /// Maximum messages sent to the model as context (default: 20)
    #[serde(default = "default_max_model_messages")]
    pub max_model_messages: usize,

    /// Maximum messages returned for UI replay (default: 100)
    #[serde(default = "default_max_replay_messages")]
    pub max_replay_messages: usize,
}

fn default_max_model_messages() -> usize {
    20
}

fn default_max_replay_messages() -> usize {
    100
}

impl Default for ConversationWindowConfig {
    fn default() -> Self {
        Self {
            max_model_messages: default_max_model_messages(),
            max_replay_messages: default_max_replay_messages(),
        }
    }
}

/// Trimming policy built from a [`ConversationWindowConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationWindow {
    config: ConversationWindowConfig,
}

impl ConversationWindow {
    pub fn new(config: ConversationWindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConversationWindowConfig {
        &self.config
    }

    /// Most recent `max_model_messages` entries, oldest first.
    pub fn trim_for_model<'a, T>(&self, history: &'a [T]) -> &'a [T] {
        keep_last(history, self.config.max_model_messages)
    }

    /// Most recent `max_replay_messages` entries, oldest first.
    pub fn trim_for_replay<'a, T>(&self, history: &'a [T]) -> &'a [T] {
        keep_last(history, self.config.max_replay_messages)
    }
}

fn keep_last<T>(history: &[T], bound: usize) -> &[T] {
    &history[history.len().saturating_sub(bound)..]
}
