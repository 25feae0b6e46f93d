use llmrelay_protocol::ApiErrorBody;
use llmrelay_protocol::claude::create_message::response::CreateMessageResponse;
use llmrelay_protocol::claude::create_message::stream::{
    ContentBlockDelta, MessageDeltaBody, MessageDeltaUsage, StreamError, StreamEvent,
};
use llmrelay_protocol::claude::create_message::types::{
    AssistantRole, ContentBlock, MessageType, StopReason, Usage,
};
use serde_json::Value as JsonValue;

use crate::generate_content::canonical2claude::response::build_response;
use crate::middleware::{Dialect, DialectAdapter};
use crate::state::{BlockIndex, FinishReason, StreamState, ToolCallState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    Text(u32),
    Thinking(u32),
}

/// Named-event stream. Wire block indices are assigned in emission order and
/// are independent of the canonical block table; a text run interrupted by a
/// tool call continues in a new wire block.
#[derive(Debug, Clone, Default)]
pub struct ClaudeMessageAdapter {
    next_index: u32,
    open: Option<OpenBlock>,
}

impl ClaudeMessageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn close_open(&mut self) -> Vec<StreamEvent> {
        match self.open.take() {
            Some(OpenBlock::Text(index) | OpenBlock::Thinking(index)) => {
                vec![StreamEvent::ContentBlockStop { index }]
            }
            None => Vec::new(),
        }
    }

    fn open_text(&mut self, out: &mut Vec<StreamEvent>) -> u32 {
        if let Some(OpenBlock::Text(index)) = self.open {
            return index;
        }
        out.extend(self.close_open());
        let index = self.allocate();
        out.push(StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlock::Text {
                text: String::new(),
            },
        });
        self.open = Some(OpenBlock::Text(index));
        index
    }

    fn open_thinking(&mut self, out: &mut Vec<StreamEvent>) -> u32 {
        if let Some(OpenBlock::Thinking(index)) = self.open {
            return index;
        }
        out.extend(self.close_open());
        let index = self.allocate();
        out.push(StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlock::Thinking {
                thinking: String::new(),
                signature: String::new(),
            },
        });
        self.open = Some(OpenBlock::Thinking(index));
        index
    }
}

impl DialectAdapter for ClaudeMessageAdapter {
    type Chunk = StreamEvent;
    type Response = CreateMessageResponse;

    const DIALECT: Dialect = Dialect::Claude;

    fn message_start(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        vec![StreamEvent::MessageStart {
            message: CreateMessageResponse {
                id: message_id(state),
                r#type: MessageType::Message,
                role: AssistantRole::Assistant,
                model: state.model().to_string(),
                content: Vec::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: Usage {
                    input_tokens: state.usage().input_tokens,
                    output_tokens: 0,
                },
            },
        }]
    }

    fn text_start(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_text(&mut out);
        out
    }

    fn text_delta(
        &mut self,
        _state: &StreamState,
        _index: BlockIndex,
        text: &str,
    ) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        let index = self.open_text(&mut out);
        out.push(StreamEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::TextDelta {
                text: text.to_string(),
            },
        });
        out
    }

    fn text_end(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        match self.open {
            Some(OpenBlock::Text(_)) => self.close_open(),
            _ => Vec::new(),
        }
    }

    fn reasoning_start(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        self.open_thinking(&mut out);
        out
    }

    fn reasoning_delta(
        &mut self,
        _state: &StreamState,
        text: &str,
        signature: Option<&str>,
    ) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        let index = self.open_thinking(&mut out);
        if !text.is_empty() {
            out.push(StreamEvent::ContentBlockDelta {
                index,
                delta: ContentBlockDelta::ThinkingDelta {
                    thinking: text.to_string(),
                },
            });
        }
        if let Some(signature) = signature {
            out.push(signature_delta(index, signature));
        }
        out
    }

    fn reasoning_end(&mut self, _state: &StreamState, signature: Option<&str>) -> Vec<Self::Chunk> {
        let mut out = Vec::new();
        match (self.open, signature) {
            (Some(OpenBlock::Thinking(index)), signature) => {
                if let Some(signature) = signature {
                    out.push(signature_delta(index, signature));
                }
                out.extend(self.close_open());
            }
            (_, Some(signature)) => {
                let index = self.open_thinking(&mut out);
                out.push(signature_delta(index, signature));
                out.extend(self.close_open());
            }
            (_, None) => {}
        }
        out
    }

    fn tool_call(
        &mut self,
        _state: &StreamState,
        call: &ToolCallState,
        _ordinal: usize,
    ) -> Vec<Self::Chunk> {
        let mut out = self.close_open();
        let index = self.allocate();
        out.push(StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: JsonValue::Object(Default::default()),
            },
        });
        out.push(StreamEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: call.arguments.clone(),
            },
        });
        out.push(StreamEvent::ContentBlockStop { index });
        out
    }

    /// Closes any open block, then `message_delta`. `message_stop` follows as
    /// the stream's done marker.
    fn finalize(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let mut out = self.close_open();
        let usage = state.usage();
        out.push(StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(map_stop_reason(state.finish_reason())),
                stop_sequence: None,
            },
            usage: MessageDeltaUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            },
        });
        out
    }

    fn error_chunk(&mut self, _state: &StreamState, error: &ApiErrorBody) -> Self::Chunk {
        StreamEvent::Error {
            error: StreamError {
                r#type: error.error.r#type.clone(),
                message: error.error.message.clone(),
            },
        }
    }

    fn build_non_streaming_response(&self, state: &StreamState) -> Self::Response {
        build_response(state)
    }
}

pub fn message_id(state: &StreamState) -> String {
    format!("msg_{}", state.message_id())
}

pub fn map_stop_reason(reason: FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ToolCalls => StopReason::ToolUse,
        FinishReason::ContentFilter => StopReason::Refusal,
    }
}

fn signature_delta(index: u32, signature: &str) -> StreamEvent {
    StreamEvent::ContentBlockDelta {
        index,
        delta: ContentBlockDelta::SignatureDelta {
            signature: signature.to_string(),
        },
    }
}
