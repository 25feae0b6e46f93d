use std::fmt;

use crate::canonical::event::{SourceFinishReason, ToolCallEvent, Usage};
use crate::canonical::message::Message;
use crate::canonical::reasoning::ReasoningConfig;
use crate::canonical::schema::Schema;

/// `provider:model` pair addressed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    /// Splits on the first `:`. Both halves must be non-empty.
    pub fn parse(value: &str) -> Option<Self> {
        let (provider, model) = value.split_once(':')?;
        let provider = provider.trim();
        let model = model.trim();
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Tool { name: String },
}

/// Provider-neutral request handed to a model stream source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    /// Model id without the provider prefix.
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub reasoning: Option<ReasoningConfig>,
    pub parallel_tool_calls: Option<bool>,
}

/// Result of a non-incremental generate call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    pub text: String,
    pub reasoning: Option<String>,
    pub reasoning_signature: Option<String>,
    pub tool_calls: Vec<ToolCallEvent>,
    pub finish_reason: Option<SourceFinishReason>,
    pub usage: Option<Usage>,
}
