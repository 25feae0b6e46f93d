use llmrelay_protocol::claude::create_message::request::CreateMessageRequestBody;
use llmrelay_protocol::claude::create_message::types::{
    ContentBlockParam, MediaSourceParam, MessageContent, MessageParam, MessageRole, SystemPrompt,
    ToolChoice as ClaudeToolChoice, ToolDefinition as ClaudeToolDefinition, ToolResultContent,
};

use crate::canonical::{
    MediaSource, Message, ModelRequest, Part, ReasoningConfig, Role, Schema, ToolChoice,
    ToolDefinition, ToolOutput,
};
use crate::generate_content::helpers::ToolNames;

pub fn transform_request(model: String, body: CreateMessageRequestBody) -> ModelRequest {
    let mut messages = Vec::new();
    if let Some(system) = body.system {
        let text = match system {
            SystemPrompt::Text(text) => text,
            SystemPrompt::Blocks(blocks) => blocks
                .into_iter()
                .map(|block| block.text)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        if !text.is_empty() {
            messages.push(Message::text(Role::System, text));
        }
    }

    let mut tool_names = ToolNames::default();
    for message in body.messages.unwrap_or_default() {
        convert_message(message, &mut tool_names, &mut messages);
    }

    let parallel_tool_calls = body.tool_choice.as_ref().and_then(|choice| match choice {
        ClaudeToolChoice::Auto {
            disable_parallel_tool_use,
        }
        | ClaudeToolChoice::Any {
            disable_parallel_tool_use,
        }
        | ClaudeToolChoice::Tool {
            disable_parallel_tool_use,
            ..
        } => disable_parallel_tool_use.map(|disabled| !disabled),
        ClaudeToolChoice::None => None,
    });

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
        max_output_tokens: body.max_tokens,
        temperature: body.temperature,
        top_p: body.top_p,
        top_k: body.top_k,
        stop_sequences: body.stop_sequences.unwrap_or_default(),
        reasoning: body.thinking.and_then(ReasoningConfig::from_thinking),
        parallel_tool_calls,
    }
}

/// Tool results inside a user turn become their own tool-role message so
/// the canonical history keeps results apart from user content.
fn convert_message(message: MessageParam, tool_names: &mut ToolNames, out: &mut Vec<Message>) {
    let role = match message.role {
        MessageRole::User => Role::User,
        MessageRole::Assistant => Role::Assistant,
    };
    let blocks = match message.content {
        MessageContent::Text(text) => vec![ContentBlockParam::Text { text }],
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut current: Option<Message> = None;
    for block in blocks {
        let Some(part) = convert_block(block, tool_names) else {
            continue;
        };
        let part_role = if matches!(part, Part::ToolResult { .. }) {
            Role::Tool
        } else {
            role
        };
        match &mut current {
            Some(message) if message.role == part_role => message.parts.push(part),
            _ => {
                out.extend(current.take());
                current = Some(Message::new(part_role, vec![part]));
            }
        }
    }
    out.extend(current);
}

fn convert_block(block: ContentBlockParam, tool_names: &mut ToolNames) -> Option<Part> {
    match block {
        ContentBlockParam::Text { text } => Some(Part::Text { text }),
        ContentBlockParam::Image { source } => {
            let (source, media_type) = convert_source(source);
            Some(Part::Image { source, media_type })
        }
        ContentBlockParam::Document { source, title } => {
            let (source, media_type) = convert_source(source);
            Some(Part::File {
                source,
                media_type,
                filename: title,
            })
        }
        ContentBlockParam::Thinking {
            thinking,
            signature,
        } => Some(Part::Reasoning {
            text: thinking,
            signature,
        }),
        ContentBlockParam::RedactedThinking { data } => Some(Part::RedactedReasoning { data }),
        ContentBlockParam::ToolUse { id, name, input } => {
            tool_names.record(&id, &name);
            Some(Part::ToolCall { id, name, input })
        }
        ContentBlockParam::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let output = match content {
                None => ToolOutput::Text(String::new()),
                Some(ToolResultContent::Text(text)) => ToolOutput::Text(text),
                Some(ToolResultContent::Blocks(blocks)) => ToolOutput::Parts(
                    blocks
                        .into_iter()
                        .filter_map(|block| convert_block(block, tool_names))
                        .collect(),
                ),
            };
            Some(Part::ToolResult {
                tool_name: tool_names.resolve(&tool_use_id),
                tool_call_id: tool_use_id,
                output,
                is_error: is_error.unwrap_or(false),
            })
        }
        ContentBlockParam::Unsupported => None,
    }
}

fn convert_source(source: MediaSourceParam) -> (MediaSource, Option<String>) {
    match source {
        MediaSourceParam::Base64 { media_type, data } => {
            (MediaSource::Base64 { data }, Some(media_type))
        }
        MediaSourceParam::Url { url } => (MediaSource::Url { url }, None),
        MediaSourceParam::Text { media_type, data } => (
            MediaSource::Text { data },
            Some(media_type.unwrap_or_else(|| "text/plain".to_string())),
        ),
        MediaSourceParam::File { file_id } => (MediaSource::FileId { file_id }, None),
    }
}

fn convert_tool(tool: ClaudeToolDefinition) -> Option<ToolDefinition> {
    match tool {
        ClaudeToolDefinition::Custom(tool) => Some(ToolDefinition {
            name: tool.name,
            description: tool.description,
            input_schema: Schema::tool_parameters(Some(&tool.input_schema)),
        }),
        ClaudeToolDefinition::Builtin(_) => None,
    }
}

fn convert_tool_choice(choice: ClaudeToolChoice) -> ToolChoice {
    match choice {
        ClaudeToolChoice::Auto { .. } => ToolChoice::Auto,
        ClaudeToolChoice::Any { .. } => ToolChoice::Required,
        ClaudeToolChoice::Tool { name, .. } => ToolChoice::Tool { name },
        ClaudeToolChoice::None => ToolChoice::None,
    }
}
