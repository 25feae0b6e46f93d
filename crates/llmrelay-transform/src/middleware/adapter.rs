use async_trait::async_trait;
use llmrelay_protocol::{ApiErrorBody, SseFrame};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::types::Dialect;
use crate::state::{BlockIndex, StreamState, ToolCallState};

/// Per-dialect hooks driven by [`crate::middleware::StreamProcessor`].
///
/// The processor updates [`StreamState`] before calling a hook, so every hook
/// sees state that already includes the event being translated. Hooks return
/// the wire chunks for that one event, in order.
pub trait DialectAdapter {
    type Chunk: SseFrame + Send + 'static;
    type Response: Serialize + Send + 'static;

    const DIALECT: Dialect;

    /// Emitted exactly once, before any content chunk.
    fn message_start(&mut self, state: &StreamState) -> Vec<Self::Chunk>;

    fn text_start(&mut self, state: &StreamState) -> Vec<Self::Chunk>;

    fn text_delta(&mut self, state: &StreamState, index: BlockIndex, text: &str)
    -> Vec<Self::Chunk>;

    fn text_end(&mut self, state: &StreamState) -> Vec<Self::Chunk>;

    fn reasoning_start(&mut self, state: &StreamState) -> Vec<Self::Chunk>;

    fn reasoning_delta(
        &mut self,
        state: &StreamState,
        text: &str,
        signature: Option<&str>,
    ) -> Vec<Self::Chunk>;

    fn reasoning_end(&mut self, state: &StreamState, signature: Option<&str>) -> Vec<Self::Chunk>;

    /// `ordinal` is the call's position among this response's tool calls.
    fn tool_call(
        &mut self,
        state: &StreamState,
        call: &ToolCallState,
        ordinal: usize,
    ) -> Vec<Self::Chunk>;

    /// Terminal chunks. The last one carries the finish reason and usage.
    fn finalize(&mut self, state: &StreamState) -> Vec<Self::Chunk>;

    /// Dialect error frame for failures after the stream was committed.
    fn error_chunk(&mut self, state: &StreamState, error: &ApiErrorBody) -> Self::Chunk;

    fn build_non_streaming_response(&self, state: &StreamState) -> Self::Response;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("downstream closed")]
pub struct SinkClosed;

/// Receives wire chunks in emission order.
#[async_trait]
pub trait ChunkSink<C: Send + 'static>: Send {
    async fn send(&mut self, chunk: C) -> Result<(), SinkClosed>;
}

#[async_trait]
impl<C: Send + 'static> ChunkSink<C> for Vec<C> {
    async fn send(&mut self, chunk: C) -> Result<(), SinkClosed> {
        self.push(chunk);
        Ok(())
    }
}

/// Sink for non-streaming callers, who only need the accumulated state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardChunks;

#[async_trait]
impl<C: Send + 'static> ChunkSink<C> for DiscardChunks {
    async fn send(&mut self, _chunk: C) -> Result<(), SinkClosed> {
        Ok(())
    }
}
