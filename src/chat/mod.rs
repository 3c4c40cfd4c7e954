//! Chat Exchange Contract: the envelopes flowing between the HTTP boundary,
//! the prompt builder and the streaming session.

pub mod types;

pub use types::{ChatRequest, ChatResponseChunk, HistoryMessage, Role, ERROR_PREFIX};
