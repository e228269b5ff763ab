// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the modelgate gateway.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via the `render()` method, which is
//! exposed through the gateway's /metrics endpoint.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use modelgate_core::GatewayError;

pub use recording::{
    estimate_savings, record_attempt, record_cost_savings, record_fallback, record_latency,
    record_tokens,
};

/// Prometheus metrics recorder wrapper.
///
/// Installs the Prometheus recorder globally. Only one recorder can be
/// installed per process.
pub struct PrometheusRecorder {
    handle: PrometheusHandle,
}

impl PrometheusRecorder {
    /// Install the recorder and register metric descriptions.
    pub fn install() -> Result<Self, GatewayError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            GatewayError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::ProviderId;

    #[test]
    fn install_and_render_round_trip() {
        // Only one recorder per process: a single test exercises install,
        // recording, and render together.
        if let Ok(recorder) = PrometheusRecorder::install() {
            record_attempt(ProviderId::Ollama, true);
            record_tokens(ProviderId::Ollama, 100, 50);
            let rendered = recorder.render();
            assert!(rendered.contains("modelgate_dispatch_attempts_total"));
        }
    }
}
