use std::marker::PhantomData;

use async_trait::async_trait;
use bytes::Bytes;
use llmrelay_protocol::{SseFrame, format_done, format_event};
use llmrelay_transform::middleware::{ChunkSink, SinkClosed};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::RelayError;

/// Item on the channel between the stream driver and the HTTP body. An `Err`
/// is only ever sent before the first frame.
pub(crate) type WireItem = Result<Bytes, RelayError>;

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";

/// Formats each chunk as one SSE frame and forwards it to the response body.
pub(crate) struct FrameSink<C> {
    tx: mpsc::Sender<WireItem>,
    trace_id: String,
    frames_sent: usize,
    _chunk: PhantomData<fn(C)>,
}

impl<C: SseFrame> FrameSink<C> {
    pub(crate) fn new(tx: mpsc::Sender<WireItem>, trace_id: impl Into<String>) -> Self {
        Self {
            tx,
            trace_id: trace_id.into(),
            frames_sent: 0,
            _chunk: PhantomData,
        }
    }

    /// Handle used to notice the body receiver going away while the source
    /// is idle.
    pub(crate) fn sender(&self) -> mpsc::Sender<WireItem> {
        self.tx.clone()
    }

    pub(crate) fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    pub(crate) async fn send_done(&mut self) -> Result<(), SinkClosed> {
        match format_done::<C>() {
            Some(marker) => self.send_bytes(Bytes::from_static(marker.as_bytes())).await,
            None => Ok(()),
        }
    }

    /// Hands a pre-stream error to the waiting handler. Returns `false` when
    /// a frame already went out and the error must be framed instead.
    pub(crate) async fn send_pre_stream_error(&mut self, error: RelayError) -> bool {
        if self.frames_sent > 0 {
            return false;
        }
        let _ = self.tx.send(Err(error)).await;
        true
    }

    async fn send_bytes(&mut self, bytes: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(bytes)).await.map_err(|_| SinkClosed)?;
        self.frames_sent += 1;
        Ok(())
    }
}

#[async_trait]
impl<C: SseFrame + Send + 'static> ChunkSink<C> for FrameSink<C> {
    async fn send(&mut self, chunk: C) -> Result<(), SinkClosed> {
        match format_event(&chunk) {
            Ok(frame) => self.send_bytes(Bytes::from(frame)).await,
            Err(err) => {
                warn!(
                    event = "frame_encode_failed",
                    trace_id = %self.trace_id,
                    error = %err
                );
                Ok(())
            }
        }
    }
}
