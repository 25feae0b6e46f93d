use llmrelay_protocol::openai::create_response::response::{ResponseObject, ResponseObjectType};
use llmrelay_protocol::openai::create_response::types::{
    IncompleteDetails, ItemStatus, OutputItem, OutputRole, ResponseStatus, ResponseUsage,
    SummaryPart,
};

use crate::canonical::Usage;
use crate::generate_content::canonical2openai_response::stream::{item_id, output_text};
use crate::state::{BlockKind, FinishReason, StreamState};

pub fn response_id(state: &StreamState) -> String {
    format!("resp_{}", state.message_id())
}

pub fn response_status(reason: FinishReason) -> (ResponseStatus, Option<IncompleteDetails>) {
    let incomplete = |reason: &str| {
        (
            ResponseStatus::Incomplete,
            Some(IncompleteDetails {
                reason: reason.to_string(),
            }),
        )
    };
    match reason {
        FinishReason::Length => incomplete("max_output_tokens"),
        FinishReason::ContentFilter => incomplete("content_filter"),
        FinishReason::Stop | FinishReason::ToolCalls => (ResponseStatus::Completed, None),
    }
}

pub fn response_object(
    state: &StreamState,
    status: ResponseStatus,
    output: Vec<OutputItem>,
    usage: Option<Usage>,
    incomplete_details: Option<IncompleteDetails>,
) -> ResponseObject {
    ResponseObject {
        id: response_id(state),
        object: ResponseObjectType::Response,
        created_at: state.created(),
        status,
        model: state.model().to_string(),
        output,
        usage: usage.map(|usage| ResponseUsage::new(usage.input_tokens, usage.output_tokens)),
        incomplete_details,
    }
}

/// Output items in block order: reasoning, then text and function calls by
/// block index.
pub fn build_response(state: &StreamState) -> ResponseObject {
    let mut output = Vec::new();
    for block in state.blocks().iter() {
        let output_index = u32::try_from(output.len()).unwrap_or(u32::MAX);
        match block.kind() {
            BlockKind::Thinking if block.content().is_empty() && block.signature().is_none() => {}
            BlockKind::Thinking => output.push(OutputItem::Reasoning {
                id: item_id("rs", state, output_index),
                summary: vec![SummaryPart::SummaryText {
                    text: block.content().to_string(),
                }],
                encrypted_content: block.signature().map(str::to_string),
            }),
            BlockKind::Text if block.content().is_empty() => {}
            BlockKind::Text => output.push(OutputItem::Message {
                id: item_id("msg", state, output_index),
                role: OutputRole::Assistant,
                status: ItemStatus::Completed,
                content: vec![output_text(block.content().to_string())],
            }),
            BlockKind::ToolUse => output.push(OutputItem::FunctionCall {
                id: item_id("fc", state, output_index),
                call_id: block.tool_id().unwrap_or_default().to_string(),
                name: block.tool_name().unwrap_or_default().to_string(),
                arguments: block.tool_input().unwrap_or_default().to_string(),
                status: ItemStatus::Completed,
            }),
        }
    }

    let (status, incomplete) = response_status(state.finish_reason());
    response_object(state, status, output, Some(state.usage()), incomplete)
}
