use serde_json::json;

use crate::canonical::{
    MediaSource, Part, ReasoningEffort, Role, SchemaKind, ToolChoice, ToolOutput,
};
use crate::generate_content::{
    claude2canonical, openai_chat_completions2canonical, openai_response2canonical,
};
use llmrelay_protocol::claude::create_message::request::CreateMessageRequestBody;
use llmrelay_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use llmrelay_protocol::openai::create_response::request::CreateResponseRequestBody;

fn claude_body(value: serde_json::Value) -> CreateMessageRequestBody {
    serde_json::from_value(value).unwrap()
}

fn chat_body(value: serde_json::Value) -> CreateChatCompletionRequestBody {
    serde_json::from_value(value).unwrap()
}

fn response_body(value: serde_json::Value) -> CreateResponseRequestBody {
    serde_json::from_value(value).unwrap()
}

#[test]
fn claude_history_resolves_tool_names_across_messages() {
    let body = claude_body(json!({
        "model": "echo:test",
        "max_tokens": 1024,
        "system": [{ "type": "text", "text": "be brief" }],
        "messages": [
            { "role": "user", "content": "weather?" },
            { "role": "assistant", "content": [
                { "type": "thinking", "thinking": "need tool", "signature": "s1" },
                { "type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": { "city": "Paris" } }
            ]},
            { "role": "user", "content": [
                { "type": "tool_result", "tool_use_id": "toolu_1", "content": "sunny" },
                { "type": "tool_result", "tool_use_id": "toolu_missing", "content": [{ "type": "text", "text": "?" }], "is_error": true },
                { "type": "text", "text": "thanks" }
            ]}
        ],
        "thinking": { "type": "enabled", "budget_tokens": 4096 }
    }));
    let request = claude2canonical::transform_request("test".to_string(), body);

    assert_eq!(request.model, "test");
    assert_eq!(request.max_output_tokens, Some(1024));
    assert_eq!(request.reasoning.unwrap().effort, ReasoningEffort::Medium);

    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::User]
    );

    let tool_turn = &request.messages[3];
    assert_eq!(tool_turn.parts.len(), 2);
    assert!(matches!(
        &tool_turn.parts[0],
        Part::ToolResult { tool_name, output: ToolOutput::Text(text), is_error: false, .. }
            if tool_name == "get_weather" && text == "sunny"
    ));
    assert!(matches!(
        &tool_turn.parts[1],
        Part::ToolResult { tool_name, is_error: true, .. } if tool_name == "unknown"
    ));
    assert!(matches!(
        &request.messages[2].parts[0],
        Part::Reasoning { signature: Some(sig), .. } if sig == "s1"
    ));
}

#[test]
fn claude_builtin_tools_are_skipped() {
    let body = claude_body(json!({
        "model": "echo:test",
        "messages": [{ "role": "user", "content": "hi" }],
        "tools": [
            { "type": "web_search_20250305", "name": "web_search", "max_uses": 3 },
            { "name": "lookup", "description": "find", "input_schema": { "type": "object" } }
        ],
        "tool_choice": { "type": "any", "disable_parallel_tool_use": true }
    }));
    let request = claude2canonical::transform_request("test".to_string(), body);
    assert_eq!(request.tools.len(), 1);
    assert_eq!(request.tools[0].name, "lookup");
    assert_eq!(
        request.tools[0].input_schema.to_json_schema(),
        json!({ "type": "object", "properties": {} })
    );
    assert_eq!(request.tool_choice, Some(ToolChoice::Required));
    assert_eq!(request.parallel_tool_calls, Some(false));
}

#[test]
fn chat_messages_convert_with_media_and_tools() {
    let body = chat_body(json!({
        "model": "echo:test",
        "messages": [
            { "role": "developer", "content": "rules" },
            { "role": "user", "content": [
                { "type": "text", "text": "look" },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA" } },
                { "type": "image_url", "image_url": { "url": "https://example.com/cat.png" } },
                { "type": "input_audio", "input_audio": { "data": "x", "format": "wav" } }
            ]},
            { "role": "assistant", "content": null, "reasoning_content": "hmm", "tool_calls": [
                { "id": "call_1", "type": "function", "function": { "name": "lookup", "arguments": "{\"q\":\"x\"}" } }
            ]},
            { "role": "tool", "tool_call_id": "call_1", "content": "found" }
        ],
        "tools": [
            { "type": "function", "function": { "name": "lookup", "parameters": { "type": "object", "properties": { "q": { "type": "string" } } } } },
            { "type": "custom", "custom": { "name": "grammar" } }
        ],
        "tool_choice": { "type": "function", "function": { "name": "lookup" } },
        "max_tokens": 50,
        "max_completion_tokens": 100,
        "stop": "END",
        "reasoning_effort": "high"
    }));
    let request = openai_chat_completions2canonical::transform_request("test".to_string(), body);

    assert_eq!(request.messages[0].role, Role::System);
    let user = &request.messages[1];
    assert_eq!(user.parts.len(), 3);
    assert!(matches!(
        &user.parts[1],
        Part::Image { source: MediaSource::Base64 { data }, media_type: Some(media) }
            if data == "AAAA" && media == "image/png"
    ));
    assert!(matches!(
        &user.parts[2],
        Part::Image { source: MediaSource::Url { .. }, media_type: None }
    ));

    let assistant = &request.messages[2];
    assert!(matches!(&assistant.parts[0], Part::Reasoning { text, .. } if text == "hmm"));
    assert!(matches!(
        &assistant.parts[1],
        Part::ToolCall { id, name, input } if id == "call_1" && name == "lookup" && input == &json!({"q": "x"})
    ));
    assert!(matches!(
        &request.messages[3].parts[0],
        Part::ToolResult { tool_name, .. } if tool_name == "lookup"
    ));

    assert_eq!(request.tools.len(), 1);
    assert_eq!(
        request.tool_choice,
        Some(ToolChoice::Tool {
            name: "lookup".to_string()
        })
    );
    assert_eq!(request.max_output_tokens, Some(100));
    assert_eq!(request.stop_sequences, vec!["END".to_string()]);
    assert_eq!(request.reasoning.unwrap().budget_tokens(), 16384);
}

#[test]
fn response_items_fold_into_turns() {
    let body = response_body(json!({
        "model": "echo:test",
        "instructions": "sys",
        "input": [
            { "role": "user", "content": "hi" },
            { "type": "reasoning", "summary": [{ "type": "summary_text", "text": "plan" }], "encrypted_content": "enc" },
            { "type": "message", "role": "assistant", "content": [{ "type": "output_text", "text": "calling" }] },
            { "type": "function_call", "call_id": "c1", "name": "lookup", "arguments": "{}" },
            { "type": "function_call_output", "call_id": "c1", "output": "done" },
            { "type": "function_call_output", "call_id": "c2", "output": "orphan" },
            { "type": "item_reference", "id": "x" }
        ],
        "tools": [
            { "type": "function", "name": "lookup", "parameters": { "type": "object", "properties": {} } },
            { "type": "web_search" }
        ],
        "reasoning": { "effort": "low" },
        "max_output_tokens": 64
    }));
    let request = openai_response2canonical::transform_request("test".to_string(), body);

    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);

    let assistant = &request.messages[2];
    assert_eq!(assistant.parts.len(), 3);
    assert!(matches!(
        &assistant.parts[0],
        Part::Reasoning { text, signature: Some(sig) } if text == "plan" && sig == "enc"
    ));
    assert!(matches!(&assistant.parts[2], Part::ToolCall { name, .. } if name == "lookup"));

    let tool = &request.messages[3];
    assert_eq!(tool.parts.len(), 2);
    assert!(matches!(
        &tool.parts[1],
        Part::ToolResult { tool_name, .. } if tool_name == "unknown"
    ));

    assert_eq!(request.tools.len(), 1);
    assert!(matches!(
        request.tools[0].input_schema.kind,
        SchemaKind::Object { .. }
    ));
    assert_eq!(request.reasoning.unwrap().effort, ReasoningEffort::Low);
    assert_eq!(request.max_output_tokens, Some(64));
}

#[test]
fn response_text_input_becomes_user_message() {
    let body = response_body(json!({ "model": "echo:test", "input": "hello" }));
    let request = openai_response2canonical::transform_request("test".to_string(), body);
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);
}
