use futures_util::Stream;

use crate::canonical::{ModelOutput, SourceEvent};

/// Replays a complete generate result as the event sequence a streaming
/// source would have produced.
pub fn simulate_stream(output: ModelOutput) -> Vec<SourceEvent> {
    let mut events = Vec::new();

    let reasoning = output.reasoning.unwrap_or_default();
    if !reasoning.is_empty() || output.reasoning_signature.is_some() {
        events.push(SourceEvent::ReasoningStart);
        if !reasoning.is_empty() {
            events.push(SourceEvent::ReasoningDelta {
                text: reasoning,
                signature: None,
            });
        }
        events.push(SourceEvent::ReasoningEnd {
            signature: output.reasoning_signature,
        });
    }

    if !output.text.is_empty() {
        events.push(SourceEvent::TextStart);
        events.push(SourceEvent::TextDelta { text: output.text });
        events.push(SourceEvent::TextEnd);
    }

    events.extend(output.tool_calls.into_iter().map(SourceEvent::ToolCall));
    events.push(SourceEvent::Finish {
        reason: output.finish_reason,
        usage: output.usage,
    });
    events
}

pub fn simulate_event_stream(output: ModelOutput) -> impl Stream<Item = SourceEvent> + Send {
    futures_util::stream::iter(simulate_stream(output))
}
