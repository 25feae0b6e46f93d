use llmrelay_protocol::claude::create_message::response::CreateMessageResponse;
use llmrelay_protocol::claude::create_message::types::{
    AssistantRole, ContentBlock, MessageType, Usage,
};

use crate::generate_content::canonical2claude::stream::{map_stop_reason, message_id};
use crate::generate_content::helpers::parse_tool_arguments;
use crate::state::{BlockKind, StreamState};

pub fn build_response(state: &StreamState) -> CreateMessageResponse {
    let content = state
        .blocks()
        .iter()
        .filter_map(|block| match block.kind() {
            BlockKind::Thinking if block.content().is_empty() && block.signature().is_none() => {
                None
            }
            BlockKind::Thinking => Some(ContentBlock::Thinking {
                thinking: block.content().to_string(),
                signature: block.signature().unwrap_or_default().to_string(),
            }),
            BlockKind::Text if block.content().is_empty() => None,
            BlockKind::Text => Some(ContentBlock::Text {
                text: block.content().to_string(),
            }),
            BlockKind::ToolUse => Some(ContentBlock::ToolUse {
                id: block.tool_id().unwrap_or_default().to_string(),
                name: block.tool_name().unwrap_or_default().to_string(),
                input: parse_tool_arguments(block.tool_input().unwrap_or_default()),
            }),
        })
        .collect();
    let usage = state.usage();

    CreateMessageResponse {
        id: message_id(state),
        r#type: MessageType::Message,
        role: AssistantRole::Assistant,
        model: state.model().to_string(),
        content,
        stop_reason: Some(map_stop_reason(state.finish_reason())),
        stop_sequence: None,
        usage: Usage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        },
    }
}
