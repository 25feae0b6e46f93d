use llmrelay_protocol::ApiErrorBody;
use llmrelay_protocol::openai::create_chat_completions::response::CreateChatCompletionResponse;
use llmrelay_protocol::openai::create_chat_completions::stream::{
    ChatCompletionChunkObjectType, ChatCompletionFunctionCallChunk,
    ChatCompletionMessageToolCallChunk, ChatCompletionStreamChoice, ChatCompletionStreamFrame,
    ChatCompletionStreamResponseDelta, CreateChatCompletionStreamResponse,
};
use llmrelay_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseRole, CompletionUsage,
};
use llmrelay_protocol::openai::types::FunctionType;

use crate::generate_content::canonical2openai_chat_completions::response::build_response;
use crate::middleware::{Dialect, DialectAdapter};
use crate::state::{BlockIndex, FinishReason, StreamState, ToolCallState};

/// Data-only chunk stream. Text and reasoning share one choice; start and
/// end events have no framing of their own.
#[derive(Debug, Clone, Default)]
pub struct OpenAIChatCompletionAdapter;

impl OpenAIChatCompletionAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DialectAdapter for OpenAIChatCompletionAdapter {
    type Chunk = ChatCompletionStreamFrame;
    type Response = CreateChatCompletionResponse;

    const DIALECT: Dialect = Dialect::OpenAIChat;

    fn message_start(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        vec![chunk(
            state,
            ChatCompletionStreamResponseDelta {
                role: Some(ChatCompletionResponseRole::Assistant),
                ..Default::default()
            },
            None,
            None,
        )]
    }

    fn text_start(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        Vec::new()
    }

    fn text_delta(
        &mut self,
        state: &StreamState,
        _index: BlockIndex,
        text: &str,
    ) -> Vec<Self::Chunk> {
        vec![chunk(
            state,
            ChatCompletionStreamResponseDelta {
                content: Some(text.to_string()),
                ..Default::default()
            },
            None,
            None,
        )]
    }

    fn text_end(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        Vec::new()
    }

    fn reasoning_start(&mut self, _state: &StreamState) -> Vec<Self::Chunk> {
        Vec::new()
    }

    fn reasoning_delta(
        &mut self,
        state: &StreamState,
        text: &str,
        _signature: Option<&str>,
    ) -> Vec<Self::Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![chunk(
            state,
            ChatCompletionStreamResponseDelta {
                reasoning_content: Some(text.to_string()),
                ..Default::default()
            },
            None,
            None,
        )]
    }

    fn reasoning_end(&mut self, _state: &StreamState, _signature: Option<&str>) -> Vec<Self::Chunk> {
        Vec::new()
    }

    fn tool_call(
        &mut self,
        state: &StreamState,
        call: &ToolCallState,
        ordinal: usize,
    ) -> Vec<Self::Chunk> {
        let tool_call = ChatCompletionMessageToolCallChunk {
            index: u32::try_from(ordinal).unwrap_or(u32::MAX),
            id: Some(call.id.clone()),
            r#type: Some(FunctionType::Function),
            function: Some(ChatCompletionFunctionCallChunk {
                name: Some(call.name.clone()),
                arguments: Some(call.arguments.clone()),
            }),
        };
        vec![chunk(
            state,
            ChatCompletionStreamResponseDelta {
                tool_calls: Some(vec![tool_call]),
                ..Default::default()
            },
            None,
            None,
        )]
    }

    fn finalize(&mut self, state: &StreamState) -> Vec<Self::Chunk> {
        let usage = state.usage();
        vec![chunk(
            state,
            ChatCompletionStreamResponseDelta::default(),
            Some(map_finish_reason(state.finish_reason())),
            Some(CompletionUsage::new(usage.input_tokens, usage.output_tokens)),
        )]
    }

    fn error_chunk(&mut self, _state: &StreamState, error: &ApiErrorBody) -> Self::Chunk {
        ChatCompletionStreamFrame::Error(error.clone())
    }

    fn build_non_streaming_response(&self, state: &StreamState) -> Self::Response {
        build_response(state)
    }
}

pub fn completion_id(state: &StreamState) -> String {
    format!("chatcmpl-{}", state.message_id())
}

pub fn map_finish_reason(reason: FinishReason) -> ChatCompletionFinishReason {
    match reason {
        FinishReason::Stop => ChatCompletionFinishReason::Stop,
        FinishReason::Length => ChatCompletionFinishReason::Length,
        FinishReason::ToolCalls => ChatCompletionFinishReason::ToolCalls,
        FinishReason::ContentFilter => ChatCompletionFinishReason::ContentFilter,
    }
}

fn chunk(
    state: &StreamState,
    delta: ChatCompletionStreamResponseDelta,
    finish_reason: Option<ChatCompletionFinishReason>,
    usage: Option<CompletionUsage>,
) -> ChatCompletionStreamFrame {
    ChatCompletionStreamFrame::Chunk(CreateChatCompletionStreamResponse {
        id: completion_id(state),
        object: ChatCompletionChunkObjectType::ChatCompletionChunk,
        created: state.created(),
        model: state.model().to_string(),
        choices: vec![ChatCompletionStreamChoice {
            index: 0,
            delta,
            finish_reason,
        }],
        usage,
    })
}
