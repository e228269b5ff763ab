// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-provider circuit breakers.
//!
//! Closed admits all; consecutive failures open the breaker for a timeout
//! window; the first call after the window admits probes in half-open
//! state; consecutive probe successes close it again, any probe failure
//! reopens it for another full window. An open breaker fails fast with
//! `circuit_breaker_open` without touching the network.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use modelgate_config::BreakerConfig;
use modelgate_core::{GatewayError, ProviderId};
use tracing::{info, warn};

/// Breaker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    open_until: Option<Instant>,
}

/// A single provider's circuit breaker.
///
/// One mutex guards the whole state tuple; critical sections are a few
/// comparisons, never I/O.
#[derive(Debug)]
pub struct CircuitBreaker {
    provider: ProviderId,
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    fn new(provider: ProviderId, config: &BreakerConfig) -> Self {
        Self {
            provider,
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            open_timeout: Duration::from_secs(config.open_timeout_secs),
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                open_until: None,
            }),
        }
    }

    /// Admit or reject a call.
    ///
    /// Rejection raises [`GatewayError::CircuitBreakerOpen`]; an elapsed
    /// open window transitions to half-open and admits the probe.
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .open_until
                    .map(|until| Instant::now() >= until)
                    .unwrap_or(true);
                if elapsed {
                    info!(provider = %self.provider, "breaker half-open, admitting probe");
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitBreakerOpen {
                        provider: self.provider,
                    })
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.success_threshold {
                    info!(provider = %self.provider, "breaker closed after successful probes");
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.open_until = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    warn!(
                        provider = %self.provider,
                        failures = inner.failure_count,
                        "breaker opened"
                    );
                    inner.state = BreakerState::Open;
                    inner.open_until = Some(Instant::now() + self.open_timeout);
                }
            }
            BreakerState::HalfOpen => {
                warn!(provider = %self.provider, "probe failed, breaker reopened");
                inner.state = BreakerState::Open;
                inner.success_count = 0;
                inner.open_until = Some(Instant::now() + self.open_timeout);
            }
            BreakerState::Open => {}
        }
    }

    /// Current state, for observability.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker mutex poisoned").state
    }

    #[cfg(test)]
    fn force_window_elapsed(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.open_until = Some(Instant::now() - Duration::from_millis(1));
    }
}

/// Process-lifetime registry of breakers, created lazily per provider.
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: DashMap<ProviderId, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create a registry with shared thresholds.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// The breaker for a provider, created on first use.
    pub fn breaker_for(&self, provider: ProviderId) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(provider)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(provider, &self.config)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            ProviderId::Ollama,
            &BreakerConfig {
                failure_threshold: 5,
                open_timeout_secs: 60,
                success_threshold: 2,
            },
        )
    }

    #[test]
    fn closed_admits_all() {
        let b = breaker();
        for _ in 0..10 {
            assert!(b.try_acquire().is_ok());
        }
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn opens_after_failure_threshold() {
        let b = breaker();
        for _ in 0..4 {
            b.record_failure();
            assert_eq!(b.state(), BreakerState::Closed);
        }
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);

        let err = b.try_acquire().unwrap_err();
        assert!(matches!(err, GatewayError::CircuitBreakerOpen { .. }));
    }

    #[test]
    fn success_resets_failure_count() {
        let b = breaker();
        for _ in 0..4 {
            b.record_failure();
        }
        b.record_success();
        for _ in 0..4 {
            b.record_failure();
        }
        assert_eq!(b.state(), BreakerState::Closed, "count reset by success");
    }

    #[test]
    fn elapsed_window_admits_probe() {
        let b = breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        assert!(b.try_acquire().is_err());

        b.force_window_elapsed();
        assert!(b.try_acquire().is_ok());
        assert_eq!(b.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn consecutive_probe_successes_close() {
        let b = breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        b.force_window_elapsed();
        b.try_acquire().unwrap();

        b.record_success();
        assert_eq!(b.state(), BreakerState::HalfOpen, "needs two successes");
        b.record_success();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn probe_failure_reopens_full_window() {
        let b = breaker();
        for _ in 0..5 {
            b.record_failure();
        }
        b.force_window_elapsed();
        b.try_acquire().unwrap();
        b.record_success();

        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
        assert!(b.try_acquire().is_err(), "fresh window rejects immediately");
    }

    #[test]
    fn registry_creates_lazily_and_caches() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let a = registry.breaker_for(ProviderId::Ollama);
        let b = registry.breaker_for(ProviderId::Ollama);
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.breaker_for(ProviderId::Openai);
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
