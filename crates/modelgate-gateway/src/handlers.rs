// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! POST /messages takes the canonical shape; POST /responses takes the
//! alternate "Responses" input shape and is lowered through the shim.
//! Both run the same pipeline: memory injection → dispatch → memory
//! extraction. Memory never fails a request.

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::{debug, warn};

use modelgate_core::{
    CanonicalRequest, CanonicalResponse, ContentBlock, GatewayError, RoutingDecision,
};
use modelgate_dispatch::DispatchOutcome;
use modelgate_memory::MemoryFilter;
use modelgate_translate::ResponsesRequest;

use crate::server::GatewayState;

/// Memories injected per request, at most.
const MEMORY_INJECT_LIMIT: usize = 5;

/// POST /messages
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(request): Json<CanonicalRequest>,
) -> Response {
    run_pipeline(state, request).await
}

/// POST /responses -- the alternate input shape, lowered via the shim.
pub async fn post_responses(
    State(state): State<GatewayState>,
    Json(request): Json<ResponsesRequest>,
) -> Response {
    let canonical = match modelgate_translate::responses_to_canonical(&request) {
        Ok(c) => c,
        Err(err) => return error_response(&err),
    };
    run_pipeline(state, canonical).await
}

async fn run_pipeline(state: GatewayState, mut request: CanonicalRequest) -> Response {
    let session_id = session_id_of(&request);

    if let Some(memory) = &state.memory {
        inject_memories(memory, &mut request, session_id.as_deref()).await;
    }

    match state.dispatcher.dispatch(request).await {
        Ok(DispatchOutcome::Complete { response, decision }) => {
            if let Some(memory) = &state.memory {
                extract_memories(memory, &response, session_id.as_deref()).await;
            }
            complete_response(*response, decision)
        }
        Ok(DispatchOutcome::Stream { upstream, .. }) => stream_response(upstream),
        Err(err) => error_response(&err),
    }
}

/// Prepend retrieved memories to the system prompt. Retrieval failures
/// yield an empty list and are only logged.
async fn inject_memories(
    memory: &crate::server::MemoryComponents,
    request: &mut CanonicalRequest,
    session_id: Option<&str>,
) {
    let query = request.last_user_text();
    if query.is_empty() {
        return;
    }

    let filter = MemoryFilter {
        session_id: session_id.map(str::to_string),
        ..Default::default()
    };
    let records = match memory
        .retriever
        .retrieve(&query, &filter, MEMORY_INJECT_LIMIT)
        .await
    {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "memory retrieval failed");
            return;
        }
    };
    if records.is_empty() {
        return;
    }

    debug!(count = records.len(), "injecting memories into system prompt");
    let mut context = String::from("Relevant context from prior sessions:\n");
    for record in &records {
        context.push_str("- ");
        context.push_str(&record.content);
        context.push('\n');
    }
    request.system = Some(match request.system.take() {
        Some(existing) => format!("{existing}\n\n{context}"),
        None => context,
    });
}

/// Scan the assistant's text for memorable fragments. Errors are logged
/// and swallowed.
async fn extract_memories(
    memory: &crate::server::MemoryComponents,
    response: &CanonicalResponse,
    session_id: Option<&str>,
) {
    let text = response
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return;
    }

    match memory
        .extractor
        .extract_and_store(session_id, Some(&response.id), &text)
        .await
    {
        Ok(stored) if !stored.is_empty() => {
            debug!(count = stored.len(), "stored extracted memories");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "memory extraction failed"),
    }
}

fn session_id_of(request: &CanonicalRequest) -> Option<String> {
    request
        .metadata
        .as_ref()
        .and_then(|m| m.get("session_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Serialize a completed response with its routing decision attached.
fn complete_response(response: CanonicalResponse, decision: RoutingDecision) -> Response {
    let mut body = match serde_json::to_value(&response) {
        Ok(v) => v,
        Err(e) => {
            return error_response(&GatewayError::Internal(format!(
                "response serialization failed: {e}"
            )))
        }
    };
    if let Ok(routing) = serde_json::to_value(&decision) {
        body["routing"] = routing;
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// Pass upstream SSE bytes through untouched.
fn stream_response(upstream: reqwest::Response) -> Response {
    let stream = upstream
        .bytes_stream()
        .map_err(|e| std::io::Error::other(format!("upstream stream error: {e}")));

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error_response(&GatewayError::Internal(format!(
                "failed to build stream response: {e}"
            )))
        })
}

/// `{error: {kind, message}}` with the taxonomy's status mapping.
fn error_response(err: &GatewayError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "error": {
            "kind": err.kind().as_str(),
            "message": err.to_string(),
        }
    });
    (status, Json(body)).into_response()
}

/// GET /health/live
pub async fn get_health_live(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.provider_name,
        "checks": {
            "uptime_secs": state.start_time.elapsed().as_secs(),
        }
    }))
}

/// GET /health/ready
pub async fn get_health_ready(State(state): State<GatewayState>) -> Response {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    match &state.memory {
        Some(memory) => match memory.store.stats().await {
            Ok(stats) => {
                checks.insert("memory".into(), json!("ok"));
                checks.insert("memory_records".into(), json!(stats.total));
            }
            Err(e) => {
                ready = false;
                checks.insert("memory".into(), json!(format!("error: {e}")));
            }
        },
        None => {
            checks.insert("memory".into(), json!("disabled"));
        }
    }

    checks.insert(
        "recent_decisions".into(),
        json!(state.dispatcher.recent_decisions().len()),
    );

    let status = if ready { "ok" } else { "degraded" };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(json!({
            "status": status,
            "provider": state.provider_name,
            "checks": Value::Object(checks),
        })),
    )
        .into_response()
}

/// GET /metrics -- Prometheus text format.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
