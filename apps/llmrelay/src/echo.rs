use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use llmrelay_core::{ModelStreamSource, RelayError, SourceEventStream};
use llmrelay_transform::canonical::{
    ModelOutput, ModelRequest, Part, Role, SourceEvent, SourceFinishReason, ToolCallEvent, Usage,
};
use serde_json::json;

const TOOL_PREFIX: &str = "call ";

/// Demo provider that answers with the last user message.
///
/// A message starting with `call ` is answered with a call to the first
/// declared tool instead, and a request with reasoning enabled gets a short
/// reasoning block first.
#[derive(Debug, Clone)]
pub(crate) struct EchoSource {
    name: &'static str,
    streaming: bool,
    delay: Duration,
}

impl EchoSource {
    pub(crate) fn streaming(delay: Duration) -> Self {
        Self {
            name: "echo",
            streaming: true,
            delay,
        }
    }

    /// Same answers, but only through `generate`.
    pub(crate) fn batch() -> Self {
        Self {
            name: "echo-batch",
            streaming: false,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ModelStreamSource for EchoSource {
    fn name(&self) -> &str {
        self.name
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn stream(&self, request: ModelRequest) -> Result<SourceEventStream, RelayError> {
        let events = output_events(echo_output(&request));
        let delay = self.delay;
        if delay.is_zero() {
            return Ok(stream::iter(events).boxed());
        }
        Ok(stream::iter(events)
            .then(move |event| async move {
                tokio::time::sleep(delay).await;
                event
            })
            .boxed())
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelOutput, RelayError> {
        Ok(echo_output(&request))
    }
}

fn echo_output(request: &ModelRequest) -> ModelOutput {
    let prompt = last_user_text(request);
    let input_tokens = request
        .messages
        .iter()
        .flat_map(|message| &message.parts)
        .map(|part| match part {
            Part::Text { text } => word_count(text),
            _ => 0,
        })
        .sum();

    let reasoning = request
        .reasoning
        .map(|config| format!("echoing {} words at {:?} effort", word_count(&prompt), config.effort));

    let tool_call = prompt
        .strip_prefix(TOOL_PREFIX)
        .zip(request.tools.first())
        .map(|(argument, tool)| ToolCallEvent {
            id: format!("call_echo_{}", tool.name),
            name: tool.name.clone(),
            input: json!({ "text": argument }),
        });

    let (text, tool_calls, finish_reason) = match tool_call {
        Some(call) => (String::new(), vec![call], SourceFinishReason::ToolCalls),
        None => (prompt, Vec::new(), SourceFinishReason::Stop),
    };
    let output_tokens = word_count(&text) + reasoning.as_deref().map_or(0, word_count);

    ModelOutput {
        text,
        reasoning,
        reasoning_signature: None,
        tool_calls,
        finish_reason: Some(finish_reason),
        usage: Some(Usage::new(input_tokens, output_tokens)),
    }
}

/// Word-level deltas, so streaming callers see more than one frame.
fn output_events(output: ModelOutput) -> Vec<SourceEvent> {
    let mut events = Vec::new();
    if let Some(reasoning) = output.reasoning {
        events.push(SourceEvent::ReasoningStart);
        events.push(SourceEvent::reasoning_delta(reasoning));
        events.push(SourceEvent::ReasoningEnd { signature: None });
    }
    if !output.text.is_empty() {
        events.push(SourceEvent::TextStart);
        events.extend(
            output
                .text
                .split_inclusive(' ')
                .map(SourceEvent::text_delta),
        );
        events.push(SourceEvent::TextEnd);
    }
    events.extend(output.tool_calls.into_iter().map(SourceEvent::ToolCall));
    events.push(SourceEvent::Finish {
        reason: output.finish_reason,
        usage: output.usage,
    });
    events
}

fn last_user_text(request: &ModelRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| {
            message
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use llmrelay_transform::canonical::{
        Message, ReasoningConfig, ReasoningEffort, Schema, ToolDefinition,
    };

    use super::*;

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            model: "test".to_string(),
            messages: vec![
                Message::text(Role::System, "be brief"),
                Message::text(Role::User, text),
            ],
            ..ModelRequest::default()
        }
    }

    #[tokio::test]
    async fn generate_echoes_last_user_message() {
        let output = EchoSource::batch().generate(request("hello there")).await.unwrap();
        assert_eq!(output.text, "hello there");
        assert_eq!(output.finish_reason, Some(SourceFinishReason::Stop));
        assert_eq!(output.usage, Some(Usage::new(4, 2)));
    }

    #[tokio::test]
    async fn stream_splits_words() {
        let events: Vec<SourceEvent> = EchoSource::streaming(Duration::ZERO)
            .stream(request("one two three"))
            .await
            .unwrap()
            .collect()
            .await;
        let text: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                SourceEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, vec!["one ", "two ", "three"]);
        assert!(matches!(events.last(), Some(SourceEvent::Finish { .. })));
    }

    #[tokio::test]
    async fn call_prefix_triggers_first_tool() {
        let mut request = request("call weather in Paris");
        request.tools = vec![ToolDefinition {
            name: "lookup".to_string(),
            description: None,
            input_schema: Schema::empty_object(),
        }];
        request.reasoning = Some(ReasoningConfig::from_effort(ReasoningEffort::Low));
        let output = EchoSource::batch().generate(request).await.unwrap();
        assert!(output.text.is_empty());
        assert_eq!(output.tool_calls.len(), 1);
        assert_eq!(output.tool_calls[0].name, "lookup");
        assert_eq!(output.tool_calls[0].input, json!({ "text": "weather in Paris" }));
        assert_eq!(output.finish_reason, Some(SourceFinishReason::ToolCalls));
        assert!(output.reasoning.is_some());
    }
}
