// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_histogram};

use modelgate_core::ProviderId;

/// Register all modelgate metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "modelgate_dispatch_attempts_total",
        "Upstream dispatch attempts per provider and outcome"
    );
    describe_counter!(
        "modelgate_fallback_total",
        "Fallback dispatches per reason and outcome"
    );
    describe_counter!("modelgate_tokens_total", "Tokens exchanged per provider");
    describe_counter!(
        "modelgate_cost_savings_usd_total",
        "Estimated cloud cost avoided by local dispatches, in USD"
    );
    describe_histogram!(
        "modelgate_dispatch_latency_seconds",
        "Upstream dispatch latency per provider"
    );
}

/// Record one dispatch attempt and its outcome.
pub fn record_attempt(provider: ProviderId, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "modelgate_dispatch_attempts_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a fallback dispatch by triggering failure class.
pub fn record_fallback(reason: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "modelgate_fallback_total",
        "reason" => reason.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record token consumption.
pub fn record_tokens(provider: ProviderId, input: u32, output: u32) {
    metrics::counter!(
        "modelgate_tokens_total",
        "provider" => provider.to_string(),
        "type" => "input"
    )
    .increment(input as u64);
    metrics::counter!(
        "modelgate_tokens_total",
        "provider" => provider.to_string(),
        "type" => "output"
    )
    .increment(output as u64);
}

/// Record dispatch latency.
pub fn record_latency(provider: ProviderId, seconds: f64) {
    metrics::histogram!(
        "modelgate_dispatch_latency_seconds",
        "provider" => provider.to_string()
    )
    .record(seconds);
}

/// Record estimated cost savings for a request that landed locally.
///
/// Charges the would-have-been cloud rate against the tokens actually
/// exchanged. Prometheus counters are integer-backed via increment, so
/// savings accumulate in micro-dollars.
pub fn record_cost_savings(provider: ProviderId, saved_usd: f64) {
    let micro_usd = (saved_usd * 1_000_000.0).round().max(0.0) as u64;
    metrics::counter!(
        "modelgate_cost_savings_usd_total",
        "provider" => provider.to_string()
    )
    .increment(micro_usd);
}

/// Estimate the cloud cost avoided by serving tokens locally.
///
/// `cloud_rate_per_mtok` is USD per million tokens, applied to input and
/// output alike.
pub fn estimate_savings(input_tokens: u32, output_tokens: u32, cloud_rate_per_mtok: f64) -> f64 {
    ((input_tokens as f64 + output_tokens as f64) / 1_000_000.0) * cloud_rate_per_mtok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savings_math() {
        // 1M tokens at $3/MTok saves $3.
        let saved = estimate_savings(600_000, 400_000, 3.0);
        assert!((saved - 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_tokens_zero_savings() {
        assert_eq!(estimate_savings(0, 0, 3.0), 0.0);
    }

    #[test]
    fn recording_helpers_do_not_panic_without_recorder() {
        // The metrics facade no-ops when no recorder is installed.
        record_attempt(ProviderId::Ollama, true);
        record_fallback("circuit_breaker", false);
        record_tokens(ProviderId::Openai, 10, 5);
        record_latency(ProviderId::Openai, 0.25);
        record_cost_savings(ProviderId::Ollama, 0.001);
    }
}
