mod deadline;
mod wire;

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::ready;
use futures_util::stream::{self, BoxStream, StreamExt};
use llmrelay_transform::generate_content::canonical2claude::ClaudeMessageAdapter;
use llmrelay_transform::generate_content::canonical2openai_chat_completions::OpenAIChatCompletionAdapter;
use llmrelay_transform::generate_content::canonical2openai_response::OpenAIResponseAdapter;
use llmrelay_transform::middleware::{
    ChunkSink, Dialect, DialectAdapter, DiscardChunks, StreamProcessor, simulate_event_stream,
};
use llmrelay_transform::state::StreamState;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::Classified;
use crate::core::CoreConfig;
use crate::error::RelayError;
use crate::provider::{ProviderRegistry, SourceEventStream};

use self::deadline::within;
use self::wire::{FrameSink, WireItem};

pub use self::wire::SSE_CONTENT_TYPE;

const FRAME_BUFFER: usize = 32;

pub type RelayStream = BoxStream<'static, Result<Bytes, Infallible>>;

pub enum RelayResponse {
    /// Complete JSON body for a non-streaming caller.
    Json(Bytes),
    /// SSE body. At least one frame has already been produced.
    Stream(RelayStream),
}

impl std::fmt::Debug for RelayResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(body) => f.debug_tuple("Json").field(&body.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Per-request lifecycle. Phases only move forward; `Erroring` is reachable
/// from any non-terminal phase and leads to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Converting,
    Invoking,
    Streaming,
    Finalizing,
    Erroring,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Converting => "converting",
            Self::Invoking => "invoking",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Erroring => "erroring",
            Self::Done => "done",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Resolving => 0,
            Self::Converting => 1,
            Self::Invoking => 2,
            Self::Streaming => 3,
            Self::Finalizing => 4,
            Self::Erroring => 5,
            Self::Done => 6,
        }
    }

    pub fn can_advance_to(self, next: Phase) -> bool {
        match self {
            Self::Done => false,
            Self::Erroring => next == Self::Done,
            _ => next.rank() > self.rank(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    trace_id: String,
    phase: Phase,
}

impl Lifecycle {
    pub(crate) fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            phase: Phase::Resolving,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub(crate) fn advance(&mut self, next: Phase) {
        if !self.phase.can_advance_to(next) {
            warn!(
                event = "phase_rejected",
                trace_id = %self.trace_id,
                from = self.phase.as_str(),
                to = next.as_str()
            );
            return;
        }
        debug!(
            event = "phase_changed",
            trace_id = %self.trace_id,
            from = self.phase.as_str(),
            to = next.as_str()
        );
        self.phase = next;
    }

    pub(crate) fn fail(&mut self, error: &RelayError) {
        warn!(
            event = "stream_failed",
            trace_id = %self.trace_id,
            phase = self.phase.as_str(),
            kind = error.kind(),
            error = %error
        );
        self.advance(Phase::Erroring);
    }
}

/// Everything a dialect run needs once the provider call is open.
struct Prepared {
    events: SourceEventStream,
    state: StreamState,
    is_stream: bool,
    deadline: Instant,
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    config: CoreConfig,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, config: CoreConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Runs one request to the point where its response can be committed.
    ///
    /// `Err` means nothing was written and the caller should answer with a
    /// JSON error. A streamed response keeps running in a background task.
    pub async fn relay(
        &self,
        classified: Classified,
        trace_id: &str,
    ) -> Result<RelayResponse, RelayError> {
        let dialect = classified.dialect();
        let mut lifecycle = Lifecycle::new(trace_id);
        let prepared = match self.prepare(classified, &mut lifecycle).await {
            Ok(prepared) => prepared,
            Err(err) => {
                lifecycle.fail(&err);
                lifecycle.advance(Phase::Done);
                return Err(err);
            }
        };

        match dialect {
            Dialect::OpenAIChat => run(OpenAIChatCompletionAdapter::new(), prepared, lifecycle).await,
            Dialect::Claude => run(ClaudeMessageAdapter::new(), prepared, lifecycle).await,
            Dialect::OpenAIResponse => {
                run(OpenAIResponseAdapter::new(), prepared, lifecycle).await
            }
        }
    }

    async fn prepare(
        &self,
        classified: Classified,
        lifecycle: &mut Lifecycle,
    ) -> Result<Prepared, RelayError> {
        let Classified {
            model,
            requested_model,
            is_stream,
            body,
        } = classified;

        let resolved = self.registry.resolve(&model).await?;
        // invocation and streaming share one budget; resolution is not part of it
        let deadline = Instant::now() + self.config.request_timeout;

        lifecycle.advance(Phase::Converting);
        let request = body.into_model_request(resolved.model.clone());

        lifecycle.advance(Phase::Invoking);
        let source = resolved.source;
        let events = if source.supports_streaming() {
            within(deadline, source.stream(request)).await?
        } else {
            let output = within(deadline, source.generate(request)).await?;
            simulate_event_stream(output).boxed()
        };

        let state = StreamState::new(
            Uuid::new_v4().simple().to_string(),
            requested_model,
            OffsetDateTime::now_utc().unix_timestamp(),
        );
        Ok(Prepared {
            events,
            state,
            is_stream,
            deadline,
        })
    }
}

async fn run<A>(
    adapter: A,
    prepared: Prepared,
    mut lifecycle: Lifecycle,
) -> Result<RelayResponse, RelayError>
where
    A: DialectAdapter + Send + 'static,
{
    let Prepared {
        events,
        state,
        is_stream,
        deadline,
    } = prepared;
    let mut processor = StreamProcessor::new(adapter, state);
    lifecycle.advance(Phase::Streaming);

    if !is_stream {
        let result = within(deadline, async {
            let mut sink = DiscardChunks;
            processor
                .process_stream(events, &mut sink)
                .await
                .map_err(RelayError::from)
        })
        .await;
        if let Err(err) = result {
            lifecycle.fail(&err);
            lifecycle.advance(Phase::Done);
            return Err(err);
        }
        lifecycle.advance(Phase::Finalizing);
        let body = serde_json::to_vec(&processor.build_non_streaming_response())
            .map_err(|err| RelayError::Upstream(format!("failed to encode response: {err}")))?;
        lifecycle.advance(Phase::Done);
        return Ok(RelayResponse::Json(Bytes::from(body)));
    }

    let (tx, mut rx) = mpsc::channel::<WireItem>(FRAME_BUFFER);
    let sink = FrameSink::new(tx, lifecycle.trace_id());
    let trace_id = lifecycle.trace_id().to_string();
    tokio::spawn(drive_stream(processor, events, deadline, sink, lifecycle));

    match rx.recv().await {
        Some(Ok(first)) => {
            info!(
                event = "stream_started",
                trace_id = %trace_id,
                dialect = A::DIALECT.as_str()
            );
            let rest = ReceiverStream::new(rx).filter_map(|item| ready(item.ok()));
            let body = stream::once(ready(first))
                .chain(rest)
                .map(Ok::<Bytes, Infallible>)
                .boxed();
            Ok(RelayResponse::Stream(body))
        }
        Some(Err(err)) => Err(err),
        None => Err(RelayError::Upstream(
            "stream ended before producing output".to_string(),
        )),
    }
}

/// Drives the adapter and writes frames until the source ends, fails, times
/// out, or the client goes away.
async fn drive_stream<A>(
    mut processor: StreamProcessor<A>,
    events: SourceEventStream,
    deadline: Instant,
    mut sink: FrameSink<A::Chunk>,
    mut lifecycle: Lifecycle,
) where
    A: DialectAdapter + Send + 'static,
{
    let disconnected = sink.sender();
    let result = tokio::select! {
        result = within(deadline, async {
            processor
                .process_stream(events, &mut sink)
                .await
                .map_err(RelayError::from)
        }) => result,
        _ = disconnected.closed() => Err(RelayError::Transport("client disconnected".to_string())),
    };
    drop(disconnected);

    match result {
        Ok(()) => {
            lifecycle.advance(Phase::Finalizing);
            if sink.send_done().await.is_err() {
                lifecycle.fail(&RelayError::Transport("client disconnected".to_string()));
                lifecycle.advance(Phase::Done);
                return;
            }
            lifecycle.advance(Phase::Done);
            let usage = processor.state().usage();
            info!(
                event = "stream_finished",
                trace_id = %lifecycle.trace_id(),
                frames = sink.frames_sent(),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens
            );
        }
        Err(err @ RelayError::Transport(_)) => {
            lifecycle.fail(&err);
            lifecycle.advance(Phase::Done);
        }
        Err(err) => {
            lifecycle.fail(&err);
            if !sink.send_pre_stream_error(err.clone()).await {
                let (_, body) = err.to_api_error();
                let chunk = processor.error_chunk(&body);
                if ChunkSink::send(&mut sink, chunk).await.is_err() {
                    debug!(
                        event = "error_frame_dropped",
                        trace_id = %lifecycle.trace_id()
                    );
                }
            }
            lifecycle.advance(Phase::Done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        assert!(Phase::Resolving.can_advance_to(Phase::Converting));
        assert!(Phase::Invoking.can_advance_to(Phase::Finalizing));
        assert!(!Phase::Streaming.can_advance_to(Phase::Invoking));
        assert!(Phase::Streaming.can_advance_to(Phase::Erroring));
        assert!(Phase::Resolving.can_advance_to(Phase::Erroring));
        assert!(Phase::Erroring.can_advance_to(Phase::Done));
        assert!(!Phase::Erroring.can_advance_to(Phase::Finalizing));
        assert!(!Phase::Done.can_advance_to(Phase::Erroring));
    }

    #[test]
    fn lifecycle_ignores_backward_steps() {
        let mut lifecycle = Lifecycle::new("t");
        lifecycle.advance(Phase::Invoking);
        lifecycle.advance(Phase::Converting);
        assert_eq!(lifecycle.phase(), Phase::Invoking);
        lifecycle.fail(&RelayError::Timeout);
        assert_eq!(lifecycle.phase(), Phase::Erroring);
        lifecycle.advance(Phase::Done);
        assert_eq!(lifecycle.phase(), Phase::Done);
    }
}
