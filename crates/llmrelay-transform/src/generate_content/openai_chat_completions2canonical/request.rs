use llmrelay_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use llmrelay_protocol::openai::create_chat_completions::types::{
    ChatCompletionContentPart, ChatCompletionRequestMessage, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionUserContent,
};
use llmrelay_protocol::openai::types::ToolChoiceMode;

use crate::canonical::{
    Message, ModelRequest, Part, ReasoningConfig, Role, Schema, ToolChoice, ToolDefinition,
    ToolOutput,
};
use crate::generate_content::helpers::{
    ToolNames, file_part, image_from_url, parse_tool_arguments,
};

pub fn transform_request(model: String, body: CreateChatCompletionRequestBody) -> ModelRequest {
    let mut tool_names = ToolNames::default();
    let messages = body
        .messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|message| convert_message(message, &mut tool_names))
        .collect();

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
        max_output_tokens: body.max_completion_tokens.or(body.max_tokens),
        temperature: body.temperature,
        top_p: body.top_p,
        top_k: None,
        stop_sequences: body.stop.map(|stop| stop.into_vec()).unwrap_or_default(),
        reasoning: body.reasoning_effort.map(ReasoningConfig::from_effort),
        parallel_tool_calls: body.parallel_tool_calls,
    }
}

fn convert_message(
    message: ChatCompletionRequestMessage,
    tool_names: &mut ToolNames,
) -> Option<Message> {
    match message {
        ChatCompletionRequestMessage::Developer(message)
        | ChatCompletionRequestMessage::System(message) => {
            Some(Message::text(Role::System, message.content.joined()))
        }
        ChatCompletionRequestMessage::User(message) => {
            let parts = match message.content {
                ChatCompletionUserContent::Text(text) => vec![Part::Text { text }],
                ChatCompletionUserContent::Parts(parts) => {
                    parts.into_iter().filter_map(convert_user_part).collect()
                }
            };
            Some(Message::new(Role::User, parts))
        }
        ChatCompletionRequestMessage::Assistant(message) => {
            let mut parts = Vec::new();
            if let Some(text) = message.reasoning_content.filter(|text| !text.is_empty()) {
                parts.push(Part::Reasoning {
                    text,
                    signature: None,
                });
            }
            if let Some(content) = message.content {
                let text = content.joined();
                if !text.is_empty() {
                    parts.push(Part::Text { text });
                }
            }
            if let Some(refusal) = message.refusal.filter(|text| !text.is_empty()) {
                parts.push(Part::Text { text: refusal });
            }
            for call in message.tool_calls.unwrap_or_default() {
                tool_names.record(&call.id, &call.function.name);
                parts.push(Part::ToolCall {
                    input: parse_tool_arguments(&call.function.arguments),
                    id: call.id,
                    name: call.function.name,
                });
            }
            (!parts.is_empty()).then(|| Message::new(Role::Assistant, parts))
        }
        ChatCompletionRequestMessage::Tool(message) => Some(Message::new(
            Role::Tool,
            vec![Part::ToolResult {
                tool_name: tool_names.resolve(&message.tool_call_id),
                tool_call_id: message.tool_call_id,
                output: ToolOutput::Text(message.content.joined()),
                is_error: false,
            }],
        )),
    }
}

fn convert_user_part(part: ChatCompletionContentPart) -> Option<Part> {
    match part {
        ChatCompletionContentPart::Text { text } => Some(Part::Text { text }),
        ChatCompletionContentPart::ImageUrl { image_url } => Some(image_from_url(&image_url.url)),
        ChatCompletionContentPart::File { file } => {
            file_part(file.file_data, file.file_id, None, file.filename)
        }
        ChatCompletionContentPart::Unsupported => None,
    }
}

fn convert_tool(tool: ChatCompletionTool) -> Option<ToolDefinition> {
    match tool {
        ChatCompletionTool::Function(tool) => Some(ToolDefinition {
            input_schema: Schema::tool_parameters(tool.function.parameters.as_ref()),
            name: tool.function.name,
            description: tool.function.description,
        }),
        ChatCompletionTool::Other(_) => None,
    }
}

fn convert_tool_choice(choice: ChatCompletionToolChoiceOption) -> ToolChoice {
    match choice {
        ChatCompletionToolChoiceOption::Mode(ToolChoiceMode::None) => ToolChoice::None,
        ChatCompletionToolChoiceOption::Mode(ToolChoiceMode::Auto) => ToolChoice::Auto,
        ChatCompletionToolChoiceOption::Mode(ToolChoiceMode::Required) => ToolChoice::Required,
        ChatCompletionToolChoiceOption::Named(named) => ToolChoice::Tool {
            name: named.function.name,
        },
    }
}
