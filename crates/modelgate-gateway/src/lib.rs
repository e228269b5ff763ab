// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP front door for the modelgate gateway.
//!
//! POST /messages accepts the canonical shape (SSE passthrough when the
//! upstream family supports it), POST /responses accepts the alternate
//! "Responses" input shape, and /health/live, /health/ready, /metrics
//! serve operations. The handlers wire the memory subsystem around the
//! dispatcher: retrieval before dispatch, extraction after.

pub mod handlers;
pub mod server;

use std::path::Path;
use std::sync::Arc;

use modelgate_config::{ModelgateConfig, ResolvedRouting};
use modelgate_core::GatewayError;
use modelgate_dispatch::Dispatcher;
use modelgate_memory::{ExtractorConfig, MemoryExtractor, MemoryRetriever, MemoryStore};

pub use server::{build_router, start_server, GatewayState, MemoryComponents};

/// Assemble the gateway state from loaded config and validated routing.
pub async fn build_state(
    config: ModelgateConfig,
    routing: ResolvedRouting,
    prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
) -> Result<GatewayState, GatewayError> {
    let provider_name = routing.primary.to_string();

    let memory = if config.memory.enabled {
        let path = Path::new(&config.memory.data_dir).join(&config.memory.database_file);
        let path = path.to_str().ok_or_else(|| {
            GatewayError::Config(format!("memory database path is not valid UTF-8: {path:?}"))
        })?;
        let store = Arc::new(MemoryStore::open(path).await?);
        let extractor = MemoryExtractor::new(
            Arc::clone(&store),
            ExtractorConfig {
                surprise_threshold: config.memory.surprise_threshold,
                recent_window: config.memory.recent_window,
                dedup_lookback: config.memory.dedup_lookback,
            },
        );
        let retriever =
            MemoryRetriever::new(Arc::clone(&store), config.memory.decay_half_life_days);
        Some(Arc::new(MemoryComponents {
            store,
            extractor,
            retriever,
        }))
    } else {
        None
    };

    let dispatcher = Arc::new(Dispatcher::new(config, routing)?);

    Ok(GatewayState {
        dispatcher,
        memory,
        provider_name,
        prometheus_render,
        start_time: std::time::Instant::now(),
    })
}
