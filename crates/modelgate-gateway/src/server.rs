// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use modelgate_core::GatewayError;
use modelgate_dispatch::Dispatcher;
use modelgate_memory::{MemoryExtractor, MemoryRetriever, MemoryStore};

use crate::handlers;

/// Memory subsystem wiring, absent when memory is disabled.
pub struct MemoryComponents {
    pub store: Arc<MemoryStore>,
    pub extractor: MemoryExtractor,
    pub retriever: MemoryRetriever,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub memory: Option<Arc<MemoryComponents>>,
    /// Primary provider identifier, echoed on health endpoints.
    pub provider_name: String,
    /// Optional Prometheus metrics render function for /metrics.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("provider_name", &self.provider_name)
            .field("memory", &self.memory.is_some())
            .field(
                "prometheus_render",
                &self.prometheus_render.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/messages", post(handlers::post_messages))
        .route("/responses", post(handlers::post_responses))
        .route("/health/live", get(handlers::get_health_live))
        .route("/health/ready", get(handlers::get_health_ready))
        .route("/metrics", get(handlers::get_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway server on host:port. Runs until the listener fails.
pub async fn start_server(host: &str, port: u16, state: GatewayState) -> Result<(), GatewayError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
