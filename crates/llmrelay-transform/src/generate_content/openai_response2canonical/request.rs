use llmrelay_protocol::openai::create_response::request::CreateResponseRequestBody;
use llmrelay_protocol::openai::create_response::types::{
    FunctionCallOutputContent, InputContentPart, InputItem, InputMessage, InputMessageContent,
    InputRole, ResponseInput, ResponseTool, ResponseToolChoice, SummaryPart, TypedInputItem,
};
use llmrelay_protocol::openai::types::ToolChoiceMode;

use crate::canonical::{
    MediaSource, Message, ModelRequest, Part, ReasoningConfig, Role, Schema, ToolChoice,
    ToolDefinition, ToolOutput,
};
use crate::generate_content::helpers::{
    ToolNames, file_part, image_from_url, parse_tool_arguments, push_merged,
};

pub fn transform_request(model: String, body: CreateResponseRequestBody) -> ModelRequest {
    let mut messages = Vec::new();
    if let Some(instructions) = body.instructions.filter(|text| !text.is_empty()) {
        messages.push(Message::text(Role::System, instructions));
    }

    match body.input {
        Some(ResponseInput::Text(text)) => messages.push(Message::text(Role::User, text)),
        Some(ResponseInput::Items(items)) => {
            let mut tool_names = ToolNames::default();
            for item in items {
                convert_item(item, &mut tool_names, &mut messages);
            }
        }
        None => {}
    }

    ModelRequest {
        model,
        messages,
        tools: body
            .tools
            .unwrap_or_default()
            .into_iter()
            .filter_map(convert_tool)
            .collect(),
        tool_choice: body.tool_choice.map(convert_tool_choice),
        max_output_tokens: body.max_output_tokens,
        temperature: body.temperature,
        top_p: body.top_p,
        top_k: None,
        stop_sequences: Vec::new(),
        reasoning: body
            .reasoning
            .and_then(|reasoning| reasoning.effort)
            .map(ReasoningConfig::from_effort),
        parallel_tool_calls: body.parallel_tool_calls,
    }
}

/// Assistant output items (messages, reasoning, function calls) fold into one
/// assistant turn; consecutive function outputs fold into one tool turn.
fn convert_item(item: InputItem, tool_names: &mut ToolNames, out: &mut Vec<Message>) {
    let item = match item {
        InputItem::Message(message) => TypedInputItem::Message(message),
        InputItem::Typed(item) => item,
    };

    match item {
        TypedInputItem::Message(message) => convert_message(message, out),
        TypedInputItem::FunctionCall {
            call_id,
            name,
            arguments,
            ..
        } => {
            tool_names.record(&call_id, &name);
            push_merged(
                out,
                Role::Assistant,
                Part::ToolCall {
                    id: call_id,
                    name,
                    input: parse_tool_arguments(&arguments),
                },
            );
        }
        TypedInputItem::FunctionCallOutput { call_id, output } => {
            let output = match output {
                FunctionCallOutputContent::Text(text) => ToolOutput::Text(text),
                FunctionCallOutputContent::Parts(parts) => {
                    ToolOutput::Parts(parts.into_iter().filter_map(convert_part).collect())
                }
            };
            push_merged(
                out,
                Role::Tool,
                Part::ToolResult {
                    tool_name: tool_names.resolve(&call_id),
                    tool_call_id: call_id,
                    output,
                    is_error: false,
                },
            );
        }
        TypedInputItem::Reasoning {
            summary,
            encrypted_content,
            ..
        } => {
            let text = summary
                .into_iter()
                .map(|SummaryPart::SummaryText { text }| text)
                .collect::<Vec<_>>()
                .join("\n");
            push_merged(
                out,
                Role::Assistant,
                Part::Reasoning {
                    text,
                    signature: encrypted_content,
                },
            );
        }
        TypedInputItem::Other => {}
    }
}

fn convert_message(message: InputMessage, out: &mut Vec<Message>) {
    let role = match message.role {
        InputRole::System | InputRole::Developer => Role::System,
        InputRole::User => Role::User,
        InputRole::Assistant => Role::Assistant,
    };
    let parts: Vec<Part> = match message.content {
        InputMessageContent::Text(text) => vec![Part::Text { text }],
        InputMessageContent::Parts(parts) => parts.into_iter().filter_map(convert_part).collect(),
    };

    if role == Role::Assistant {
        for part in parts {
            push_merged(out, role, part);
        }
    } else if !parts.is_empty() {
        out.push(Message::new(role, parts));
    }
}

fn convert_part(part: InputContentPart) -> Option<Part> {
    match part {
        InputContentPart::InputText { text } | InputContentPart::OutputText { text } => {
            Some(Part::Text { text })
        }
        InputContentPart::Refusal { refusal } => Some(Part::Text { text: refusal }),
        InputContentPart::InputImage { image_url, file_id } => match (image_url, file_id) {
            (Some(url), _) => Some(image_from_url(&url)),
            (None, Some(file_id)) => Some(Part::Image {
                source: MediaSource::FileId { file_id },
                media_type: None,
            }),
            (None, None) => None,
        },
        InputContentPart::InputFile {
            file_data,
            file_id,
            file_url,
            filename,
        } => file_part(file_data, file_id, file_url, filename),
        InputContentPart::Unsupported => None,
    }
}

fn convert_tool(tool: ResponseTool) -> Option<ToolDefinition> {
    match tool {
        ResponseTool::Function(tool) => Some(ToolDefinition {
            input_schema: Schema::tool_parameters(tool.parameters.as_ref()),
            name: tool.name,
            description: tool.description,
        }),
        ResponseTool::Other(_) => None,
    }
}

fn convert_tool_choice(choice: ResponseToolChoice) -> ToolChoice {
    match choice {
        ResponseToolChoice::Mode(ToolChoiceMode::None) => ToolChoice::None,
        ResponseToolChoice::Mode(ToolChoiceMode::Auto) => ToolChoice::Auto,
        ResponseToolChoice::Mode(ToolChoiceMode::Required) => ToolChoice::Required,
        ResponseToolChoice::Function(named) => ToolChoice::Tool { name: named.name },
    }
}
