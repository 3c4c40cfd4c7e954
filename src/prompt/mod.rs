//! Prompt Builder
//!
//! Turns a raw user message, an optional instruction template and optional
//! named parameters into the single prompt string handed to a provider.
//! Everything here is pure: same inputs, same output, no I/O.

pub mod template;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chat::types::ChatRequest;
use crate::error::{ChatError, Result};

pub use template::PromptTemplate;

/// Reserved placeholder that always receives the user's message.
pub const QUESTION: &str = "question";

/// Delimiter block appended to instruction templates that do not place the
/// question themselves.
pub const EMPTY: &str = "\n------\n{{question}}\n------\n";

/// Marker the caller replaces with retrieved document content.
pub const DOCS_MARKER: &str = "[docs]";

/// Document-analysis instruction.
pub const DOCUMENT: &str = "You are good at analyzing documents. Please analyze my questions according to the following documents, question: [{{question}}], [docs]";

/// Markdown outline engineer
pub const MINDMAP: &str = include_str!("../../prompts/mindmap.md");

/// Professional Markdown copywriter
pub const WRITE: &str = include_str!("../../prompts/write.md");

/// Image generation instruction
pub const IMAGE: &str = include_str!("../../prompts/image.md");

/// Built-in instruction templates a request can select by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPreset {
    Mindmap,
    Write,
    Image,
}

impl PromptPreset {
    pub fn template(&self) -> &'static str {
        match self {
            PromptPreset::Mindmap => MINDMAP,
            PromptPreset::Write => WRITE,
            PromptPreset::Image => IMAGE,
        }
    }
}

/// Prompt with no instruction: the message itself.
pub fn build(message: &str) -> String {
    message.to_string()
}

/// Prompt from an instruction template whose only placeholder is `question`.
///
/// The delimiter block is appended unless the template already places the
/// question.
pub fn build_with_template(message: &str, template: &str) -> Result<String> {
    let mut parsed = PromptTemplate::new(template);
    if !parsed.has_variable(QUESTION) {
        parsed = PromptTemplate::new(format!("{template}{EMPTY}"));
    }

    let unknown: Vec<&str> = parsed
        .variables()
        .into_iter()
        .filter(|name| *name != QUESTION)
        .collect();
    if !unknown.is_empty() {
        return Err(ChatError::Template(format!(
            "unresolved placeholder(s): {}",
            unknown.join(", ")
        )));
    }

    parsed.render(&HashMap::from([(QUESTION.to_string(), message.to_string())]))
}

/// Prompt from a template and a parameter object.
///
/// `params` must serialize to a JSON object; its top-level fields become
/// placeholder values and `question` is always bound to `message`.
pub fn build_with_params<P>(message: &str, template: &str, params: &P) -> Result<String>
where
    P: Serialize + ?Sized,
{
    let parsed = PromptTemplate::new(template);
    let mut values = flatten_params(params)?;
    values.insert(QUESTION.to_string(), message.to_string());
    parsed.render(&values)
}

/// Document-analysis prompt. `[docs]` is left for the caller to fill.
pub fn build_for_documents(message: &str) -> String {
    template::fill(DOCUMENT, QUESTION, message)
}

/// Pick the prompt shape for an inbound request.
///
/// Order: documents, template with params, template, preset, raw message.
pub fn build_for_request(request: &ChatRequest) -> Result<String> {
    let message = request.message.as_str();
    if request.docs_id.is_some() {
        return Ok(build_for_documents(message));
    }
    match (request.prompt_text.as_deref(), request.params.as_ref()) {
        (Some(template), Some(params)) if !template.trim().is_empty() => {
            build_with_params(message, template, params)
        }
        (Some(template), _) if !template.trim().is_empty() => {
            build_with_template(message, template)
        }
        _ => match request.preset {
            Some(preset) => build_with_template(message, preset.template()),
            None => Ok(build(message)),
        },
    }
}

fn flatten_params<P>(params: &P) -> Result<HashMap<String, String>>
where
    P: Serialize + ?Sized,
{
    let value = serde_json::to_value(params)
        .map_err(|e| ChatError::Template(format!("params are not serializable: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(ChatError::Template(
            "params must be an object of named values".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
