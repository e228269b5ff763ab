// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide HTTP connection pools.
//!
//! One keep-alive client serves all batch requests; a second client
//! serves SSE endpoints -- it carries no total-request timeout (streams
//! may be long-lived), so callers bound stream consumption with an outer
//! wall clock instead.

use std::time::Duration;

use modelgate_config::PoolConfig;
use modelgate_core::GatewayError;

/// The shared client pair.
#[derive(Debug, Clone)]
pub struct ClientPool {
    standard: reqwest::Client,
    sse: reqwest::Client,
    request_timeout: Duration,
}

impl ClientPool {
    /// Build both clients from pool configuration.
    pub fn new(config: &PoolConfig) -> Result<Self, GatewayError> {
        let standard = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_sockets)
            .pool_idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;

        let sse = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_sockets)
            .pool_idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build SSE client: {e}")))?;

        Ok(Self {
            standard,
            sse,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// The batch-request client.
    pub fn standard(&self) -> &reqwest::Client {
        &self.standard
    }

    /// The SSE client: no body-read timeout.
    pub fn sse(&self) -> &reqwest::Client {
        &self.sse
    }

    /// Default per-request deadline, for providers without an override.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
