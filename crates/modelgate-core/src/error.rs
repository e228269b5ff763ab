// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the modelgate gateway.
//!
//! Every upstream failure is categorized into a [`GatewayError`] variant.
//! The dispatcher drives retry, breaker accounting, and fallback entirely
//! off [`GatewayError::kind`] and the predicates below -- never off string
//! matching.

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderId;

/// The primary error type used across all modelgate crates.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors (unknown provider, missing endpoint or key,
    /// invalid tier settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection-level failures: refused, reset, DNS.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The upstream call exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Upstream returned HTTP 429.
    #[error("rate limited by upstream: {message}")]
    RateLimited { message: String },

    /// Upstream returned a 5xx status.
    #[error("upstream server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// The provider's circuit breaker is open; no network attempt was made.
    #[error("circuit breaker open for provider {provider}")]
    CircuitBreakerOpen { provider: ProviderId },

    /// Upstream rejected the request (4xx other than 429).
    #[error("invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    /// Upstream rejected the injected tool schemas.
    #[error("provider rejected tool schema: {message}")]
    ToolIncompatible { message: String },

    /// Upstream returned a syntactically valid but unusable response
    /// (missing or empty `choices`, unparseable body).
    #[error("malformed upstream response: {message}")]
    MalformedResponse { message: String },

    /// Memory store failures (database open, query, FTS).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Flat error classification used for wire serialization and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    Timeout,
    RateLimited,
    ServerError,
    CircuitBreakerOpen,
    InvalidRequest,
    ToolIncompatible,
    MalformedResponse,
    Storage,
    Internal,
}

impl ErrorKind {
    /// Stable string form for `{error: {kind, message}}` bodies and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerError => "server_error",
            ErrorKind::CircuitBreakerOpen => "circuit_breaker_open",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::ToolIncompatible => "tool_incompatible",
            ErrorKind::MalformedResponse => "no_choices",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "error",
        }
    }
}

impl GatewayError {
    /// The flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Config(_) => ErrorKind::Config,
            GatewayError::Transport { .. } => ErrorKind::Transport,
            GatewayError::Timeout { .. } => ErrorKind::Timeout,
            GatewayError::RateLimited { .. } => ErrorKind::RateLimited,
            GatewayError::ServerError { .. } => ErrorKind::ServerError,
            GatewayError::CircuitBreakerOpen { .. } => ErrorKind::CircuitBreakerOpen,
            GatewayError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            GatewayError::ToolIncompatible { .. } => ErrorKind::ToolIncompatible,
            GatewayError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            GatewayError::Storage { .. } => ErrorKind::Storage,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the retry loop may attempt this request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::ServerError
        )
    }

    /// Whether this failure increments the provider's breaker counter.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::ServerError
                | ErrorKind::ToolIncompatible
                | ErrorKind::MalformedResponse
        )
    }

    /// Whether the dispatcher may route this request to the fallback provider.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::ServerError
                | ErrorKind::CircuitBreakerOpen
                | ErrorKind::ToolIncompatible
        )
    }

    /// HTTP status to surface to the caller.
    ///
    /// Mirrors the upstream status where one exists; untranslatable kinds
    /// map to 502, timeouts to 504, breaker-open and config errors to 503.
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::InvalidRequest { status, .. } => *status,
            GatewayError::ServerError { status, .. } => *status,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::Timeout { .. } => 504,
            GatewayError::CircuitBreakerOpen { .. } => 503,
            GatewayError::Config(_) => 503,
            _ => 502,
        }
    }
}
