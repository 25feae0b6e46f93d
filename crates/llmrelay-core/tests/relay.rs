use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use futures_util::StreamExt;
use futures_util::stream;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use llmrelay_core::{
    Core, CoreConfig, ModelStreamSource, ProviderRegistry, REQUEST_ID_HEADER, RelayError,
    SourceEventStream,
};
use llmrelay_protocol::{SseEvent, SseParser};
use llmrelay_transform::canonical::{
    ModelOutput, ModelRequest, SourceEvent, SourceFinishReason, UpstreamError, Usage,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct ScriptedSource {
    events: Vec<SourceEvent>,
    output: ModelOutput,
    streaming: bool,
    stall: bool,
    prepare_error: Option<RelayError>,
    prepare_delay: Duration,
    event_delay: Duration,
    dropped: Option<Arc<AtomicBool>>,
}

impl ScriptedSource {
    fn streaming(events: Vec<SourceEvent>) -> Self {
        Self {
            events,
            output: ModelOutput::default(),
            streaming: true,
            stall: false,
            prepare_error: None,
            prepare_delay: Duration::ZERO,
            event_delay: Duration::ZERO,
            dropped: None,
        }
    }

    fn one_shot(output: ModelOutput) -> Self {
        Self {
            output,
            streaming: false,
            ..Self::streaming(Vec::new())
        }
    }
}

/// Raises its flag when the source stream holding it is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelStreamSource for ScriptedSource {
    fn name(&self) -> &str {
        "echo"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn prepare(&self, _model: &str) -> Result<(), RelayError> {
        if !self.prepare_delay.is_zero() {
            tokio::time::sleep(self.prepare_delay).await;
        }
        match &self.prepare_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn stream(&self, _request: ModelRequest) -> Result<SourceEventStream, RelayError> {
        let delay = self.event_delay;
        let mut events = stream::iter(self.events.clone())
            .then(move |event| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                event
            })
            .boxed();
        if self.stall {
            events = events.chain(stream::pending()).boxed();
        }
        if let Some(flag) = &self.dropped {
            let guard = DropFlag(flag.clone());
            events = events
                .map(move |event| {
                    let _held = &guard;
                    event
                })
                .boxed();
        }
        Ok(events)
    }

    async fn generate(&self, _request: ModelRequest) -> Result<ModelOutput, RelayError> {
        Ok(self.output.clone())
    }
}

fn router_with(source: ScriptedSource, request_timeout: Duration) -> Router {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(source));
    Core::new(registry, CoreConfig { request_timeout }).router()
}

fn router(source: ScriptedSource) -> Router {
    router_with(source, Duration::from_secs(30))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn sse_events(response: axum::response::Response) -> Vec<SseEvent> {
    let bytes = body_bytes(response).await;
    let mut parser = SseParser::new();
    let mut events = parser.push(&bytes);
    events.extend(parser.finish());
    events
}

fn plain_text_events() -> Vec<SourceEvent> {
    vec![
        SourceEvent::text_delta("Hel"),
        SourceEvent::text_delta("lo"),
        SourceEvent::finish(Some(SourceFinishReason::Stop), Some(Usage::new(10, 2))),
    ]
}

#[tokio::test]
async fn chat_stream_writes_frames_then_done() {
    let app = router(ScriptedSource::streaming(plain_text_events()));
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({
                "model": "echo:gpt-test",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let events = sse_events(response).await;
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|event| event.event.is_none()));
    assert_eq!(events[4].data, "[DONE]");

    let frames: Vec<Value> = events[..4]
        .iter()
        .map(|event| serde_json::from_str(&event.data).unwrap())
        .collect();
    assert_eq!(frames[0]["choices"][0]["delta"], json!({ "role": "assistant" }));
    assert_eq!(frames[0]["model"], "echo:gpt-test");
    assert_eq!(frames[1]["choices"][0]["delta"]["content"], "Hel");
    assert_eq!(frames[2]["choices"][0]["delta"]["content"], "lo");
    assert_eq!(frames[3]["choices"][0]["finish_reason"], "stop");
    assert_eq!(
        frames[3]["usage"],
        json!({ "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 })
    );
    let id = frames[0]["id"].as_str().unwrap();
    assert!(id.starts_with("chatcmpl-"));
    assert!(frames.iter().all(|frame| frame["id"] == id));
}

#[tokio::test]
async fn missing_messages_is_a_json_400() {
    let app = router(ScriptedSource::streaming(plain_text_events()));
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({ "model": "echo:gpt-test", "stream": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "missing_messages");
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn unknown_provider_is_model_not_found() {
    let app = router(ScriptedSource::streaming(plain_text_events()));
    let response = app
        .oneshot(post(
            "/v1/messages",
            json!({
                "model": "nowhere:claude",
                "max_tokens": 16,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "model_not_found");
}

#[tokio::test]
async fn provider_config_failure_happens_before_streaming() {
    let mut source = ScriptedSource::streaming(plain_text_events());
    source.prepare_error = Some(RelayError::ProviderConfig("missing API key".to_string()));
    let app = router(source);
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({
                "model": "echo:gpt-test",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "authentication_error");
}

#[tokio::test]
async fn claude_non_stream_over_one_shot_source() {
    let app = router(ScriptedSource::one_shot(ModelOutput {
        text: "ans".to_string(),
        reasoning: Some("think".to_string()),
        reasoning_signature: Some("sig".to_string()),
        tool_calls: Vec::new(),
        finish_reason: Some(SourceFinishReason::Stop),
        usage: Some(Usage::new(3, 4)),
    }));
    let response = app
        .oneshot(post(
            "/v1/messages",
            json!({
                "model": "echo:claude-test",
                "max_tokens": 64,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["type"], "message");
    assert_eq!(
        body["content"],
        json!([
            { "type": "thinking", "thinking": "think", "signature": "sig" },
            { "type": "text", "text": "ans" }
        ])
    );
    assert_eq!(body["stop_reason"], "end_turn");
    assert_eq!(body["usage"]["input_tokens"], 3);
    assert_eq!(body["usage"]["output_tokens"], 4);
}

#[tokio::test]
async fn claude_mid_stream_error_ends_without_message_stop() {
    let app = router(ScriptedSource::streaming(vec![
        SourceEvent::text_delta("partial"),
        SourceEvent::Error(UpstreamError::new("connection reset")),
    ]));
    let response = app
        .oneshot(post(
            "/v1/messages",
            json!({
                "model": "echo:claude-test",
                "max_tokens": 64,
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = sse_events(response).await;
    let names: Vec<&str> = events
        .iter()
        .map(|event| event.event.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(
        names,
        vec![
            "message_start",
            "content_block_start",
            "content_block_delta",
            "error"
        ]
    );
    let error: Value = serde_json::from_str(&events[3].data).unwrap();
    assert_eq!(error["error"]["message"], "connection reset");
}

#[tokio::test]
async fn error_before_first_frame_is_a_json_error() {
    let app = router(ScriptedSource::streaming(vec![SourceEvent::Error(
        UpstreamError::new("upstream connection refused"),
    )]));
    let response = app
        .oneshot(post(
            "/v1/responses",
            json!({ "model": "echo:resp-test", "stream": true, "input": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "upstream_unavailable");
}

#[tokio::test]
async fn responses_stream_is_sequenced() {
    let app = router(ScriptedSource::streaming(vec![
        SourceEvent::reasoning_delta("plan"),
        SourceEvent::text_delta("done"),
        SourceEvent::tool_call("call_1", "lookup", json!({ "q": "x" })),
        SourceEvent::finish(None, Some(Usage::new(5, 6))),
    ]));
    let response = app
        .oneshot(post(
            "/v1/responses",
            json!({ "model": "echo:resp-test", "stream": true, "input": "hi" }),
        ))
        .await
        .unwrap();

    let events = sse_events(response).await;
    assert_eq!(events.first().and_then(|e| e.event.as_deref()), Some("response.created"));
    assert_eq!(events.last().and_then(|e| e.event.as_deref()), Some("response.completed"));

    for (expected, event) in events.iter().enumerate() {
        let frame: Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(frame["sequence_number"], expected as u64);
        assert_eq!(frame["type"].as_str(), event.event.as_deref());
    }

    let completed: Value = serde_json::from_str(&events.last().unwrap().data).unwrap();
    assert_eq!(completed["response"]["usage"]["total_tokens"], 11);
    let output = completed["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 3);
    assert_eq!(output[2]["type"], "function_call");
    assert_eq!(output[2]["arguments"], r#"{"q":"x"}"#);
}

#[tokio::test(start_paused = true)]
async fn stalled_source_times_out_with_error_frame() {
    let mut source = ScriptedSource::streaming(vec![SourceEvent::text_delta("slow")]);
    source.stall = true;
    let app = router_with(source, Duration::from_secs(5));
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({
                "model": "echo:gpt-test",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = sse_events(response).await;
    let last: Value = serde_json::from_str(&events.last().unwrap().data).unwrap();
    assert_eq!(last["error"]["code"], "upstream_unavailable");
    assert!(events.iter().all(|event| event.data != "[DONE]"));
}

#[tokio::test]
async fn client_disconnect_drops_source_stream() {
    let dropped = Arc::new(AtomicBool::new(false));
    let mut source = ScriptedSource::streaming(vec![SourceEvent::text_delta("first")]);
    source.stall = true;
    source.dropped = Some(dropped.clone());
    let app = router(source);
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({
                "model": "echo:gpt-test",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    assert!(frame.is_data());
    assert!(!dropped.load(Ordering::SeqCst));

    drop(body);
    for _ in 0..200 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn provider_resolution_does_not_consume_the_request_budget() {
    let mut source = ScriptedSource::streaming(plain_text_events());
    source.prepare_delay = Duration::from_secs(10);
    source.event_delay = Duration::from_secs(1);
    let app = router_with(source, Duration::from_secs(5));
    let response = app
        .oneshot(post(
            "/v1/chat/completions",
            json!({
                "model": "echo:gpt-test",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = sse_events(response).await;
    assert_eq!(events.last().map(|event| event.data.as_str()), Some("[DONE]"));
}

#[tokio::test]
async fn health_lists_providers() {
    let app = router(ScriptedSource::streaming(Vec::new()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body, json!({ "status": "ok", "providers": ["echo"] }));
}
