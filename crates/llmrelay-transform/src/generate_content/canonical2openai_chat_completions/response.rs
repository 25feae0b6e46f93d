use llmrelay_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, ChatCompletionObjectType, ChatCompletionResponseMessage,
    CreateChatCompletionResponse,
};
use llmrelay_protocol::openai::create_chat_completions::types::{
    ChatCompletionFunctionCall, ChatCompletionMessageToolCall, ChatCompletionResponseRole,
    CompletionUsage,
};
use llmrelay_protocol::openai::types::FunctionType;

use crate::generate_content::canonical2openai_chat_completions::stream::{
    completion_id, map_finish_reason,
};
use crate::state::StreamState;

pub fn build_response(state: &StreamState) -> CreateChatCompletionResponse {
    let content = state
        .text()
        .map(|block| block.content().to_string())
        .filter(|text| !text.is_empty());
    let reasoning_content = state
        .reasoning()
        .map(|block| block.content().to_string())
        .filter(|text| !text.is_empty());
    let tool_calls: Vec<ChatCompletionMessageToolCall> = state
        .tool_calls()
        .iter()
        .map(|call| ChatCompletionMessageToolCall {
            id: call.id.clone(),
            r#type: FunctionType::Function,
            function: ChatCompletionFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        })
        .collect();
    let usage = state.usage();

    CreateChatCompletionResponse {
        id: completion_id(state),
        object: ChatCompletionObjectType::ChatCompletion,
        created: state.created(),
        model: state.model().to_string(),
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: ChatCompletionResponseMessage {
                role: ChatCompletionResponseRole::Assistant,
                content,
                reasoning_content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            },
            finish_reason: map_finish_reason(state.finish_reason()),
        }],
        usage: CompletionUsage::new(usage.input_tokens, usage.output_tokens),
    }
}
