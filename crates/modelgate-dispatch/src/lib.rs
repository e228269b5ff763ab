// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The resilience fabric around every upstream call.
//!
//! Per-provider circuit breakers, bounded exponential-backoff retries,
//! shared connection pools, the per-family endpoint/auth table, SSE
//! consumption for the browser-automation family, and the dispatcher
//! that ties them together with one-shot fallback.

pub mod breaker;
pub mod dispatcher;
pub mod families;
pub mod pool;
pub mod retry;
pub mod sse;

pub use breaker::{BreakerRegistry, BreakerState, CircuitBreaker};
pub use dispatcher::{failure_category, DispatchOutcome, Dispatcher};
pub use families::{endpoint_for, ProviderEndpoint};
pub use pool::ClientPool;
pub use retry::RetryPolicy;
