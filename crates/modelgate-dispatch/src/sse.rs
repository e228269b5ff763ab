// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE consumption for the browser-automation family.
//!
//! The TinyFish endpoint answers `text/event-stream`: intermediate
//! progress events, then a terminal `COMPLETE` event whose payload carries
//! `status` and `resultJson`. A `COMPLETE` with non-success status is a
//! provider error, not a transport error. The whole consumption is
//! bounded by an outer wall clock since the SSE client has no body-read
//! timeout.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use modelgate_core::{
    CanonicalRequest, CanonicalResponse, ContentBlock, GatewayError, Role, StopReason, Usage,
};
use modelgate_translate::openai::generate_message_id;

/// Terminal event payload.
#[derive(Debug, Clone, Deserialize)]
struct CompletePayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "resultJson", default)]
    result_json: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Build the automation request body from a canonical request.
///
/// The target URL comes from request metadata; the goal is the last user
/// message. A missing URL is the caller's error, not the provider's.
pub fn build_automation_body(request: &CanonicalRequest) -> Result<Value, GatewayError> {
    let metadata = request.metadata.as_ref();
    let url = metadata
        .and_then(|m| m.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest {
            status: 400,
            message: "browser automation requires a `url` in request metadata".to_string(),
        })?;

    let goal = request.last_user_text();
    if goal.is_empty() {
        return Err(GatewayError::InvalidRequest {
            status: 400,
            message: "browser automation requires a user message as the goal".to_string(),
        });
    }

    let mut body = serde_json::json!({
        "url": url,
        "goal": goal,
        "browserProfile": metadata
            .and_then(|m| m.get("browser_profile"))
            .and_then(Value::as_str)
            .unwrap_or("default"),
    });
    if let Some(proxy) = metadata.and_then(|m| m.get("proxy")).and_then(Value::as_str) {
        body["proxy"] = Value::String(proxy.to_string());
    }
    Ok(body)
}

/// Consume the automation event stream until its terminal event.
///
/// Returns the `resultJson` payload on success. EOF before `COMPLETE` is
/// a malformed response; exceeding `deadline` is a timeout for breaker
/// accounting.
pub async fn consume_automation_stream(
    response: reqwest::Response,
    deadline: Duration,
) -> Result<Value, GatewayError> {
    let consume = async {
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| GatewayError::Transport {
                message: format!("SSE stream error: {e}"),
                source: Some(Box::new(e)),
            })?;

            let payload: CompletePayload = match serde_json::from_str(&event.data) {
                Ok(p) => p,
                Err(_) => {
                    debug!(event = %event.event, "skipping non-JSON SSE frame");
                    continue;
                }
            };

            if event.event == "COMPLETE" || matches!(payload.status.as_deref(), Some("COMPLETED" | "SUCCESS" | "FAILED" | "ERROR")) {
                let status = payload.status.as_deref().unwrap_or("");
                if matches!(status, "COMPLETED" | "SUCCESS") {
                    return Ok(payload.result_json.unwrap_or(Value::Null));
                }
                warn!(status, "browser automation completed unsuccessfully");
                return Err(GatewayError::ServerError {
                    status: 502,
                    message: format!(
                        "browser automation failed ({status}): {}",
                        payload.message.unwrap_or_default()
                    ),
                });
            }
        }

        Err(GatewayError::MalformedResponse {
            message: "automation stream ended without a COMPLETE event".to_string(),
        })
    };

    match tokio::time::timeout(deadline, consume).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout { duration: deadline }),
    }
}

/// Wrap the automation result as a canonical response.
pub fn automation_result_to_canonical(result: Value, requested_model: &str) -> CanonicalResponse {
    let text = match result {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    CanonicalResponse {
        id: generate_message_id(),
        role: Role::Assistant,
        content: vec![ContentBlock::Text { text }],
        model: requested_model.to_string(),
        stop_reason: StopReason::EndTurn,
        usage: Usage::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serve raw SSE text and return a live reqwest::Response for it.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;
        reqwest::get(&server.uri()).await.unwrap()
    }

    fn request_with_metadata(metadata: Value) -> CanonicalRequest {
        CanonicalRequest {
            model: "tinyfish".into(),
            system: None,
            messages: vec![modelgate_core::CanonicalMessage::text(
                Role::User,
                "extract the pricing table",
            )],
            tools: None,
            temperature: None,
            top_p: None,
            max_tokens: 1024,
            stream: false,
            metadata: Some(metadata),
        }
    }

    #[test]
    fn body_requires_url_metadata() {
        let err = build_automation_body(&request_with_metadata(serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest { .. }));

        let body = build_automation_body(&request_with_metadata(
            serde_json::json!({"url": "https://example.com", "proxy": "socks5://p"}),
        ))
        .unwrap();
        assert_eq!(body["url"], "https://example.com");
        assert_eq!(body["goal"], "extract the pricing table");
        assert_eq!(body["browserProfile"], "default");
        assert_eq!(body["proxy"], "socks5://p");
    }

    #[tokio::test]
    async fn complete_success_returns_result_json() {
        let sse = "event: PROGRESS\ndata: {\"step\":\"navigating\"}\n\n\
                   event: COMPLETE\ndata: {\"status\":\"COMPLETED\",\"resultJson\":{\"price\":42}}\n\n";
        let response = mock_sse_response(sse).await;

        let result = consume_automation_stream(response, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"price": 42}));
    }

    #[tokio::test]
    async fn success_status_variant_is_accepted() {
        let sse = "event: COMPLETE\ndata: {\"status\":\"SUCCESS\",\"resultJson\":\"done\"}\n\n";
        let response = mock_sse_response(sse).await;
        let result = consume_automation_stream(response, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result, Value::String("done".into()));
    }

    #[tokio::test]
    async fn complete_failure_is_provider_error() {
        let sse =
            "event: COMPLETE\ndata: {\"status\":\"FAILED\",\"message\":\"blocked by captcha\"}\n\n";
        let response = mock_sse_response(sse).await;

        let err = consume_automation_stream(response, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            GatewayError::ServerError { message, .. } => {
                assert!(message.contains("captcha"));
            }
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn eof_without_complete_is_malformed() {
        let sse = "event: PROGRESS\ndata: {\"step\":\"navigating\"}\n\n";
        let response = mock_sse_response(sse).await;

        let err = consume_automation_stream(response, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn split_frames_are_reassembled() {
        // eventsource-stream carries partial frames across chunk
        // boundaries; a single body is still one parse path, so this
        // guards the frame separator handling.
        let sse = "data: {\"step\":\"one\"}\n\ndata: {\"status\":\"COMPLETED\",\"resultJson\":1}\n\n";
        let response = mock_sse_response(sse).await;
        let result = consume_automation_stream(response, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!(1));
    }

    #[test]
    fn result_wraps_as_canonical_text() {
        let response =
            automation_result_to_canonical(serde_json::json!({"rows": [1, 2]}), "tinyfish");
        assert_eq!(response.model, "tinyfish");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        match &response.content[0] {
            ContentBlock::Text { text } => assert!(text.contains("rows")),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
