//! # a3s-chat
//!
//! Streaming chat sessions between end users and LLM providers.
//!
//! ## Overview
//!
//! One chat request becomes one [`session::StreamingSession`]: the prompt is
//! built from the message and an optional template, prior turns are trimmed
//! by the [`window::ConversationWindow`], and generation runs on its own task
//! while chunks stream back to the client. Completion, provider errors,
//! client disconnects and the session deadline all end the session through
//! the same single-writer guard, so the client sees exactly one terminal
//! chunk and the worker is torn down exactly once.
//!
//! ## Modules
//!
//! - **prompt**: prompt builder and template engine
//! - **window**: conversation window bounds
//! - **chat**: request and chunk envelopes
//! - **session**: the streaming session state machine
//! - **provider**: `ModelProvider` trait, registry, echo provider
//! - **service**: request → session orchestration
//! - **api** / **server**: axum HTTP surface with SSE

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod history;
pub mod prompt;
pub mod provider;
pub mod server;
pub mod service;
pub mod session;
pub mod window;

// Re-export core types
pub use chat::types::{ChatRequest, ChatResponseChunk, HistoryMessage, Role};
pub use config::{ChatConfig, ProviderSettings, SessionConfig};
pub use error::{ChatError, Result};
pub use history::{HistoryStore, MemoryHistoryStore};
pub use provider::{GenerationEvent, GenerationRequest, ModelProvider, ProviderRegistry};
pub use service::ChatService;
pub use session::{ChunkStream, SessionState, StreamingSession};
pub use window::{ConversationWindow, ConversationWindowConfig};
