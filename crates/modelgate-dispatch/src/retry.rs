// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential-backoff retry for non-streaming dispatches.
//!
//! Delay schedule: exponential with multiplier 2 and ±25% jitter, capped.
//! Rate-limited attempts start from a doubled initial delay. Streaming
//! requests never pass through this module; their errors surface to the
//! caller directly.

use std::future::Future;
use std::time::Duration;

use modelgate_config::RetryConfig;
use modelgate_core::{ErrorKind, GatewayError};
use rand::Rng;
use tracing::warn;

/// Retry policy derived from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build from config; attempts are clamped to at least one.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Backoff before retry number `attempt` (1-based), jittered ±25%.
    pub fn delay_for(&self, attempt: u32, kind: ErrorKind) -> Duration {
        let base = if kind == ErrorKind::RateLimited {
            // 429s get a longer runway before the first retry.
            self.initial_delay * 2
        } else {
            self.initial_delay
        };
        let exponential = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.max_delay);

        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        capped.mul_f64(jitter).min(self.max_delay)
    }

    /// Run `op` under the retry policy.
    ///
    /// `op` receives the 1-based attempt number and must rebuild the
    /// request each call -- the idempotency guard: a request body is never
    /// partially consumed across attempts because each attempt serializes
    /// it fresh.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt, err.kind());
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
