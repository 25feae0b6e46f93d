use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use llmrelay_transform::middleware::Dialect;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classify::classify_request;
use crate::core::CoreState;
use crate::error::RelayError;
use crate::orchestrator::{RelayResponse, SSE_CONTENT_TYPE};

pub const REQUEST_ID_HEADER: &str = "x-llmrelay-request-id";

pub async fn chat_completions_handler(
    State(state): State<Arc<CoreState>>,
    body: Bytes,
) -> Response {
    relay_handler(state, Dialect::OpenAIChat, body).await
}

pub async fn messages_handler(State(state): State<Arc<CoreState>>, body: Bytes) -> Response {
    relay_handler(state, Dialect::Claude, body).await
}

pub async fn responses_handler(State(state): State<Arc<CoreState>>, body: Bytes) -> Response {
    relay_handler(state, Dialect::OpenAIResponse, body).await
}

pub async fn health_handler(State(state): State<Arc<CoreState>>) -> Response {
    Json(json!({
        "status": "ok",
        "providers": state.orchestrator.registry().provider_names(),
    }))
    .into_response()
}

async fn relay_handler(state: Arc<CoreState>, dialect: Dialect, body: Bytes) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();

    let classified = match classify_request(dialect, &body) {
        Ok(classified) => classified,
        Err(err) => return error_response(err, dialect, &trace_id, started_at),
    };

    let is_stream = classified.is_stream;
    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        dialect = dialect.as_str(),
        model = %classified.requested_model,
        is_stream
    );

    match state.orchestrator.relay(classified, &trace_id).await {
        Ok(response) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                dialect = dialect.as_str(),
                status = StatusCode::OK.as_u16(),
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream
            );
            relay_response(response, &trace_id)
        }
        Err(err) => error_response(err, dialect, &trace_id, started_at),
    }
}

fn relay_response(response: RelayResponse, trace_id: &str) -> Response {
    let mut resp = match response {
        RelayResponse::Json(body) => {
            let mut resp = Response::new(Body::from(body));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
        RelayResponse::Stream(stream) => {
            let mut resp = Response::new(Body::from_stream(stream));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(SSE_CONTENT_TYPE));
            resp.headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            resp
        }
    };
    insert_request_id(&mut resp, trace_id);
    resp
}

fn error_response(
    err: RelayError,
    dialect: Dialect,
    trace_id: &str,
    started_at: Instant,
) -> Response {
    let (status, body) = err.to_api_error();
    warn!(
        event = "downstream_responded",
        trace_id = %trace_id,
        dialect = dialect.as_str(),
        status = status.as_u16(),
        code = %body.error.code,
        error = %body.error.message,
        elapsed_ms = started_at.elapsed().as_millis(),
        is_stream = false
    );
    let mut resp = (status, Json(body)).into_response();
    insert_request_id(&mut resp, trace_id);
    resp
}

fn insert_request_id(resp: &mut Response, trace_id: &str) {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}
