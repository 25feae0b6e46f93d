use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Finish reason as reported by the model source, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other,
    Unknown,
}

/// A complete tool invocation. Arguments arrive whole, never as deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallEvent {
    pub id: String,
    pub name: String,
    pub input: JsonValue,
}

/// Error raised by the model source. Carried to the caller unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One semantic event from a model stream source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    TextStart,
    TextDelta {
        text: String,
    },
    TextEnd,
    ReasoningStart,
    ReasoningDelta {
        text: String,
        /// Provider thought signature, when the delta carries one.
        signature: Option<String>,
    },
    ReasoningEnd {
        signature: Option<String>,
    },
    ToolCall(ToolCallEvent),
    /// Results of provider-executed tools. Never echoed downstream.
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: JsonValue,
    },
    FinishStep {
        reason: Option<SourceFinishReason>,
        usage: Option<Usage>,
    },
    Finish {
        reason: Option<SourceFinishReason>,
        usage: Option<Usage>,
    },
    Error(UpstreamError),
}

impl SourceEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        SourceEvent::TextDelta { text: text.into() }
    }

    pub fn reasoning_delta(text: impl Into<String>) -> Self {
        SourceEvent::ReasoningDelta {
            text: text.into(),
            signature: None,
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, input: JsonValue) -> Self {
        SourceEvent::ToolCall(ToolCallEvent {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    pub fn finish(reason: Option<SourceFinishReason>, usage: Option<Usage>) -> Self {
        SourceEvent::Finish { reason, usage }
    }

    /// Events that put content on the wire and therefore require the
    /// message-start framing first.
    pub fn is_content_bearing(&self) -> bool {
        matches!(
            self,
            SourceEvent::TextStart
                | SourceEvent::TextDelta { .. }
                | SourceEvent::ReasoningStart
                | SourceEvent::ReasoningDelta { .. }
                | SourceEvent::ReasoningEnd { signature: Some(_) }
                | SourceEvent::ToolCall(_)
        )
    }
}
