// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end request dispatch.
//!
//! Lifecycle: analyze → route → acquire breaker → translate → POST under
//! the retry policy → translate back, with a one-shot fallback to the
//! configured secondary when a local primary fails with an eligible
//! class. Streaming requests are never retried; the only family streamed
//! through opaquely is Anthropic-native, whose wire format is already
//! canonical.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use modelgate_config::{ModelgateConfig, ResolvedRouting};
use modelgate_core::{
    CanonicalRequest, CanonicalResponse, ErrorKind, Family, GatewayError, ProviderId, RouteMethod,
    RoutingDecision,
};
use modelgate_prometheus as metrics;
use modelgate_router::{select_tools, Analysis, ComplexityAnalyzer, ProviderRouter};
use modelgate_translate::bedrock::{from_converse_response, to_converse_request, ConverseResponse};
use modelgate_translate::ollama::{from_ollama_response, to_ollama_request, OllamaChatResponse};
use modelgate_translate::openai::{
    from_openai_response, to_openai_request, OpenAiChatResponse, OpenAiOptions,
};
use modelgate_translate::{
    compact_ollama_messages, compact_openai_messages, effective_tools, to_ollama_tools,
    to_openai_tools,
};

use crate::breaker::BreakerRegistry;
use crate::families::{endpoint_for, ProviderEndpoint};
use crate::pool::ClientPool;
use crate::retry::RetryPolicy;
use crate::sse::{automation_result_to_canonical, build_automation_body, consume_automation_stream};

/// What a dispatch produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A fully translated response.
    Complete {
        response: Box<CanonicalResponse>,
        decision: RoutingDecision,
    },
    /// An opaque upstream SSE stream, passed through to the front door.
    Stream {
        upstream: reqwest::Response,
        decision: RoutingDecision,
    },
}

/// Recent routing decisions kept for observability.
const DECISION_LOG_CAPACITY: usize = 128;

/// The request dispatcher. Process-lifetime singleton; each request
/// borrows it.
pub struct Dispatcher {
    config: ModelgateConfig,
    analyzer: ComplexityAnalyzer,
    router: ProviderRouter,
    pool: ClientPool,
    breakers: BreakerRegistry,
    retry: RetryPolicy,
    decisions: std::sync::Mutex<std::collections::VecDeque<RoutingDecision>>,
}

impl Dispatcher {
    /// Build a dispatcher from loaded config and validated routing.
    pub fn new(config: ModelgateConfig, routing: ResolvedRouting) -> Result<Self, GatewayError> {
        let local_provider = find_local_provider(&config, &routing);
        let analyzer = ComplexityAnalyzer::new(routing.mode);
        let router = ProviderRouter::new(routing, local_provider);
        let pool = ClientPool::new(&config.pool)?;
        let breakers = BreakerRegistry::new(config.breaker.clone());
        let retry = RetryPolicy::new(&config.retry);

        Ok(Self {
            config,
            analyzer,
            router,
            pool,
            breakers,
            retry,
            decisions: std::sync::Mutex::new(std::collections::VecDeque::with_capacity(
                DECISION_LOG_CAPACITY,
            )),
        })
    }

    /// The most recent routing decisions, newest last.
    pub fn recent_decisions(&self) -> Vec<RoutingDecision> {
        self.decisions
            .lock()
            .expect("decision log mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn log_decision(&self, decision: &RoutingDecision) {
        let mut log = self.decisions.lock().expect("decision log mutex poisoned");
        if log.len() == DECISION_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(decision.clone());
    }

    /// Dispatch one canonical request.
    pub async fn dispatch(
        &self,
        request: CanonicalRequest,
    ) -> Result<DispatchOutcome, GatewayError> {
        let analysis = self.analyzer.analyze(&request);
        let decision = self.router.route(&analysis);
        let primary = decision.provider;

        debug!(
            provider = %primary,
            score = analysis.total,
            method = ?decision.method,
            "routing decision"
        );

        let started = Instant::now();
        match self.attempt(&request, &analysis, &decision).await {
            Ok(outcome) => {
                self.log_decision(&decision);
                self.record_success(primary, started, &outcome);
                Ok(outcome)
            }
            Err(err) => {
                metrics::record_attempt(primary, false);
                metrics::record_latency(primary, started.elapsed().as_secs_f64());

                if !(err.is_fallback_eligible()
                    && primary.is_local()
                    && self.router.fallback_enabled())
                {
                    return Err(err);
                }
                let Some(fallback) = self.router.fallback_provider() else {
                    return Err(err);
                };

                let reason = failure_category(err.kind());
                warn!(
                    primary = %primary,
                    fallback = %fallback,
                    reason,
                    "primary failed, dispatching to fallback"
                );

                // Fallback re-runs the full dispatch, translation included:
                // the two providers rarely share a wire format.
                let fallback_decision = RoutingDecision {
                    provider: fallback,
                    model: None,
                    method: RouteMethod::Fallback,
                    score: decision.score,
                    threshold: decision.threshold,
                    mode: decision.mode,
                    fallback_reason: Some(reason.to_string()),
                };

                let fallback_started = Instant::now();
                match self.attempt(&request, &analysis, &fallback_decision).await {
                    Ok(outcome) => {
                        self.log_decision(&fallback_decision);
                        metrics::record_fallback(reason, true);
                        self.record_success(fallback, fallback_started, &outcome);
                        Ok(outcome)
                    }
                    Err(fallback_err) => {
                        metrics::record_fallback(reason, false);
                        metrics::record_attempt(fallback, false);
                        // The fallback's error is the more actionable one.
                        Err(fallback_err)
                    }
                }
            }
        }
    }

    /// One full attempt against one provider: breaker, translation, wire
    /// call, reverse translation.
    async fn attempt(
        &self,
        request: &CanonicalRequest,
        analysis: &Analysis,
        decision: &RoutingDecision,
    ) -> Result<DispatchOutcome, GatewayError> {
        let provider = decision.provider;
        let breaker = self.breakers.breaker_for(provider);
        breaker.try_acquire()?;

        let settings = self
            .config
            .providers
            .get(&provider.to_string())
            .cloned()
            .unwrap_or_default();
        let upstream_model = decision
            .model
            .clone()
            .or_else(|| settings.model.clone())
            .unwrap_or_else(|| request.model.clone());

        let tools = effective_tools(
            request.tools.as_deref(),
            provider,
            self.config.tools.inject_for_local,
        );
        let tools = select_tools(
            tools,
            analysis.class,
            analysis.mode,
            provider,
            self.config.tools.token_budget,
        );

        let endpoint = endpoint_for(provider, &settings, &upstream_model)?;
        let timeout = settings
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.pool.request_timeout());

        let result = self
            .attempt_family(
                request,
                provider,
                &upstream_model,
                &tools,
                &endpoint,
                timeout,
                decision,
            )
            .await;

        match &result {
            Ok(_) => breaker.record_success(),
            Err(err) if err.counts_against_breaker() => breaker.record_failure(),
            Err(_) => {}
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt_family(
        &self,
        request: &CanonicalRequest,
        provider: ProviderId,
        upstream_model: &str,
        tools: &[modelgate_core::ToolDefinition],
        endpoint: &ProviderEndpoint,
        timeout: Duration,
        decision: &RoutingDecision,
    ) -> Result<DispatchOutcome, GatewayError> {
        let tools_sent = !tools.is_empty();
        match provider.family() {
            Family::OpenaiChat | Family::AzureResponses => {
                let mut effective = request.clone();
                if effective.stream {
                    // No canonical-SSE translator for this family yet.
                    warn!(%provider, "streaming unsupported for this family, forcing it off");
                    effective.stream = false;
                }

                let opts = OpenAiOptions {
                    use_max_completion_tokens: provider.family() == Family::AzureResponses,
                };
                let openai_tools = tools_sent.then(|| to_openai_tools(tools));
                let mut body = to_openai_request(&effective, upstream_model, openai_tools, &opts);
                if provider.is_local() {
                    body.messages = compact_openai_messages(body.messages);
                }
                let body = to_json(&body)?;

                let text = self
                    .retry
                    .run(|_| self.execute(endpoint, &body, timeout, tools_sent))
                    .await?;
                let parsed: OpenAiChatResponse = parse_body(&text)?;
                let response = from_openai_response(parsed, &request.model)?;
                Ok(DispatchOutcome::Complete {
                    response: Box::new(response),
                    decision: decision.clone(),
                })
            }
            Family::AnthropicNative => {
                let body = anthropic_body(request, upstream_model, tools);

                if request.stream {
                    // The wire format is already canonical; hand the SSE
                    // bytes through untouched. Streams are never retried.
                    let upstream = self
                        .send_sse(endpoint, &body)
                        .await
                        .and_then(check_stream_status)?;
                    info!(%provider, "streaming passthrough established");
                    return Ok(DispatchOutcome::Stream {
                        upstream,
                        decision: decision.clone(),
                    });
                }

                let text = self
                    .retry
                    .run(|_| self.execute(endpoint, &body, timeout, tools_sent))
                    .await?;
                let mut response: CanonicalResponse = parse_body(&text)?;
                response.model = request.model.clone();
                Ok(DispatchOutcome::Complete {
                    response: Box::new(response),
                    decision: decision.clone(),
                })
            }
            Family::BedrockConverse => {
                let converse = to_converse_request(request, tools_sent.then_some(tools));
                let body = to_json(&converse)?;

                let text = self
                    .retry
                    .run(|_| self.execute(endpoint, &body, timeout, tools_sent))
                    .await?;
                let parsed: ConverseResponse = parse_body(&text)?;
                let response = from_converse_response(parsed, &request.model)?;
                Ok(DispatchOutcome::Complete {
                    response: Box::new(response),
                    decision: decision.clone(),
                })
            }
            Family::OllamaNative => {
                let mut effective = request.clone();
                if effective.stream {
                    warn!(%provider, "streaming unsupported for this family, forcing it off");
                    effective.stream = false;
                }

                let ollama_tools = tools_sent.then(|| to_ollama_tools(tools));
                let mut body = to_ollama_request(&effective, upstream_model, ollama_tools);
                body.messages = compact_ollama_messages(body.messages);
                let body = to_json(&body)?;

                let text = self
                    .retry
                    .run(|_| self.execute(endpoint, &body, timeout, tools_sent))
                    .await?;
                let parsed: OllamaChatResponse = parse_body(&text)?;
                let response = from_ollama_response(parsed, &request.model)?;
                Ok(DispatchOutcome::Complete {
                    response: Box::new(response),
                    decision: decision.clone(),
                })
            }
            Family::TinyFishSse => {
                let body = build_automation_body(request)?;
                let upstream = self
                    .send_sse(endpoint, &body)
                    .await
                    .and_then(check_stream_status)?;
                let result = consume_automation_stream(upstream, timeout).await?;
                let response = automation_result_to_canonical(result, &request.model);
                Ok(DispatchOutcome::Complete {
                    response: Box::new(response),
                    decision: decision.clone(),
                })
            }
        }
    }

    /// Single non-streaming POST; success bodies come back as text,
    /// everything else as a categorized error.
    async fn execute(
        &self,
        endpoint: &ProviderEndpoint,
        body: &Value,
        timeout: Duration,
        tools_sent: bool,
    ) -> Result<String, GatewayError> {
        let mut req = self
            .pool
            .standard()
            .post(&endpoint.url)
            .timeout(timeout)
            .json(body);
        for (name, value) in &endpoint.headers {
            req = req.header(*name, value);
        }

        let response = req.send().await.map_err(|e| map_reqwest_error(e, timeout))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| GatewayError::Transport {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(classify_status(status, &text, tools_sent))
        }
    }

    /// POST through the SSE client (no body-read timeout).
    async fn send_sse(
        &self,
        endpoint: &ProviderEndpoint,
        body: &Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut req = self.pool.sse().post(&endpoint.url).json(body);
        for (name, value) in &endpoint.headers {
            req = req.header(*name, value);
        }
        req.send()
            .await
            .map_err(|e| map_reqwest_error(e, self.pool.request_timeout()))
    }

    fn record_success(&self, provider: ProviderId, started: Instant, outcome: &DispatchOutcome) {
        metrics::record_attempt(provider, true);
        metrics::record_latency(provider, started.elapsed().as_secs_f64());

        if let DispatchOutcome::Complete { response, .. } = outcome {
            metrics::record_tokens(
                provider,
                response.usage.input_tokens,
                response.usage.output_tokens,
            );
            if provider.is_local() {
                let saved = metrics::estimate_savings(
                    response.usage.input_tokens,
                    response.usage.output_tokens,
                    self.config.metrics.cloud_rate_per_mtok,
                );
                metrics::record_cost_savings(provider, saved);
            }
        }
    }
}

/// Build an Anthropic-native (canonical) request body.
fn anthropic_body(
    request: &CanonicalRequest,
    upstream_model: &str,
    tools: &[modelgate_core::ToolDefinition],
) -> Value {
    let mut body = serde_json::json!({
        "model": upstream_model,
        "messages": request.messages,
        "max_tokens": request.max_tokens,
        "stream": request.stream,
    });
    if let Some(system) = &request.system {
        body["system"] = Value::String(system.clone());
    }
    if let Some(t) = request.temperature {
        body["temperature"] = serde_json::json!(t);
    }
    if let Some(t) = request.top_p {
        body["top_p"] = serde_json::json!(t);
    }
    if !tools.is_empty() {
        body["tools"] = serde_json::json!(tools);
    }
    body
}

/// First local provider configured, for force-local divergence.
fn find_local_provider(config: &ModelgateConfig, routing: &ResolvedRouting) -> Option<ProviderId> {
    if routing.primary.is_local() {
        return Some(routing.primary);
    }
    config
        .providers
        .keys()
        .filter_map(|key| key.parse::<ProviderId>().ok())
        .find(ProviderId::is_local)
}

/// Map a reqwest error to the gateway taxonomy.
fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout { duration: timeout }
    } else {
        GatewayError::Transport {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// Categorize a non-success HTTP status.
fn classify_status(status: u16, body: &str, tools_sent: bool) -> GatewayError {
    match status {
        429 => GatewayError::RateLimited {
            message: truncate(body),
        },
        500.. => GatewayError::ServerError {
            status,
            message: truncate(body),
        },
        _ => {
            let lower = body.to_lowercase();
            if tools_sent && (lower.contains("tool") || lower.contains("function")) {
                GatewayError::ToolIncompatible {
                    message: truncate(body),
                }
            } else {
                GatewayError::InvalidRequest {
                    status,
                    message: truncate(body),
                }
            }
        }
    }
}

/// A non-success status on a stream request carries no parseable body
/// translation; classify it like a batch response.
fn check_stream_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        Ok(response)
    } else if status == 429 {
        Err(GatewayError::RateLimited {
            message: format!("stream request rejected with {status}"),
        })
    } else if status >= 500 {
        Err(GatewayError::ServerError {
            status,
            message: "stream request rejected".to_string(),
        })
    } else {
        Err(GatewayError::InvalidRequest {
            status,
            message: "stream request rejected".to_string(),
        })
    }
}

/// The dispatcher-level failure category, used as the fallback reason and
/// metrics label.
pub fn failure_category(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::CircuitBreakerOpen => "circuit_breaker",
        ErrorKind::Timeout => "timeout",
        ErrorKind::Transport => "service_unavailable",
        ErrorKind::ToolIncompatible => "tool_incompatible",
        ErrorKind::RateLimited => "rate_limited",
        _ => "error",
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::Internal(format!("request serialization failed: {e}")))
}

fn parse_body<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::MalformedResponse {
        message: format!("failed to parse upstream response: {e}"),
    })
}

fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
