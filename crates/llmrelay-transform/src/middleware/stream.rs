use futures_util::{Stream, StreamExt};
use llmrelay_protocol::ApiErrorBody;
use thiserror::Error;

use crate::canonical::{SourceEvent, UpstreamError};
use crate::middleware::adapter::{ChunkSink, DialectAdapter, SinkClosed};
use crate::state::{StreamState, ToolCallRecord};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("upstream stream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    SinkClosed(#[from] SinkClosed),
}

/// Drives one adapter over one request's source events.
#[derive(Debug)]
pub struct StreamProcessor<A: DialectAdapter> {
    state: StreamState,
    adapter: A,
    finalized: bool,
}

impl<A: DialectAdapter> StreamProcessor<A> {
    pub fn new(adapter: A, state: StreamState) -> Self {
        Self {
            state,
            adapter,
            finalized: false,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Translates one event. An error event is returned unmodified and no
    /// chunk is produced for it.
    pub fn push(&mut self, event: SourceEvent) -> Result<Vec<A::Chunk>, UpstreamError> {
        if self.finalized {
            return Ok(Vec::new());
        }

        let mut out = if event.is_content_bearing() {
            self.ensure_started()
        } else {
            Vec::new()
        };

        match event {
            SourceEvent::TextStart => {
                self.state.ensure_text();
                out.extend(self.adapter.text_start(&self.state));
            }
            SourceEvent::TextDelta { text } => {
                if !text.is_empty() {
                    let index = self.state.append_text(&text);
                    out.extend(self.adapter.text_delta(&self.state, index, &text));
                }
            }
            SourceEvent::TextEnd => {
                out.extend(self.adapter.text_end(&self.state));
            }
            SourceEvent::ReasoningStart => {
                self.state.ensure_reasoning();
                out.extend(self.adapter.reasoning_start(&self.state));
            }
            SourceEvent::ReasoningDelta { text, signature } => {
                self.state.append_reasoning(&text);
                if let Some(signature) = &signature {
                    self.state.set_reasoning_signature(signature.clone());
                }
                out.extend(
                    self.adapter
                        .reasoning_delta(&self.state, &text, signature.as_deref()),
                );
            }
            SourceEvent::ReasoningEnd { signature } => {
                if let Some(signature) = &signature {
                    self.state.set_reasoning_signature(signature.clone());
                }
                out.extend(
                    self.adapter
                        .reasoning_end(&self.state, signature.as_deref()),
                );
            }
            SourceEvent::ToolCall(call) => match self.state.record_tool_call(&call) {
                ToolCallRecord::New { ordinal } => {
                    let recorded = &self.state.tool_calls()[ordinal];
                    out.extend(self.adapter.tool_call(&self.state, recorded, ordinal));
                }
                ToolCallRecord::Repeated { .. } => {}
            },
            SourceEvent::ToolResult { .. } => {}
            SourceEvent::FinishStep { reason, usage } => {
                self.state.record_finish_step(reason, usage);
            }
            SourceEvent::Finish { reason, usage } => {
                self.state.record_finish(reason, usage);
            }
            SourceEvent::Error(error) => return Err(error),
        }

        Ok(out)
    }

    /// Finalizes once; later calls return nothing.
    pub fn finish(&mut self) -> Vec<A::Chunk> {
        if self.finalized {
            return Vec::new();
        }
        let mut out = self.ensure_started();
        out.extend(self.adapter.finalize(&self.state));
        self.finalized = true;
        out
    }

    /// Consumes `events` in order, handing each chunk to `sink` before the
    /// next event is pulled. Stops at the first error event.
    pub async fn process_stream<S, K>(&mut self, events: S, sink: &mut K) -> Result<(), ProcessError>
    where
        S: Stream<Item = SourceEvent>,
        K: ChunkSink<A::Chunk> + ?Sized,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            for chunk in self.push(event)? {
                sink.send(chunk).await?;
            }
        }
        for chunk in self.finish() {
            sink.send(chunk).await?;
        }
        Ok(())
    }

    pub fn build_non_streaming_response(&self) -> A::Response {
        self.adapter.build_non_streaming_response(&self.state)
    }

    pub fn error_chunk(&mut self, error: &ApiErrorBody) -> A::Chunk {
        self.adapter.error_chunk(&self.state, error)
    }

    fn ensure_started(&mut self) -> Vec<A::Chunk> {
        if self.state.mark_message_started() {
            self.adapter.message_start(&self.state)
        } else {
            Vec::new()
        }
    }
}
