// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the modelgate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level modelgate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelgateConfig {
    /// Gateway server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider selection and tier routing.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-provider endpoint/credential/model settings, keyed by
    /// provider identifier (e.g. "openai", "ollama").
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,

    /// Retry policy for non-streaming dispatches.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-provider circuit breaker thresholds.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// HTTP connection pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Tool catalog injection and budgets.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Long-term memory subsystem.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Metrics and cost-savings estimation.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Provider selection, routing mode, tiers, and fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Primary provider identifier.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Routing aggressiveness: "aggressive", "heuristic", "conservative".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Tier settings, each of the form `provider:model`. Tier routing is
    /// enabled only when all four are set.
    #[serde(default)]
    pub tier_simple: Option<String>,
    #[serde(default)]
    pub tier_medium: Option<String>,
    #[serde(default)]
    pub tier_complex: Option<String>,
    #[serde(default)]
    pub tier_reasoning: Option<String>,

    /// Enable one-shot fallback when a local primary fails.
    #[serde(default)]
    pub fallback_enabled: bool,

    /// Fallback provider identifier. Local providers are rejected here
    /// at startup.
    #[serde(default)]
    pub fallback_provider: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            mode: default_mode(),
            tier_simple: None,
            tier_medium: None,
            tier_complex: None,
            tier_reasoning: None,
            fallback_enabled: false,
            fallback_provider: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_mode() -> String {
    "heuristic".to_string()
}

/// Endpoint/credential/model settings for one provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Base endpoint URL. Required for every provider except those with
    /// a fixed public endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Credential material (API key). `None` requires the provider to
    /// accept unauthenticated requests (Ollama, llama.cpp).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model or deployment name sent to the upstream.
    #[serde(default)]
    pub model: Option<String>,

    /// Per-request timeout in seconds; falls back to pool default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// API version string for providers that require one
    /// (Anthropic-native, Azure Responses).
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Retry policy for non-streaming dispatches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum attempts per dispatch (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Per-provider circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before admitting a probe.
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Consecutive half-open successes required to close.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    2
}

/// HTTP connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum idle sockets kept per host.
    #[serde(default = "default_max_sockets")]
    pub max_sockets: usize,

    /// Keep-alive idle timeout in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Default per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sockets: default_max_sockets(),
            idle_timeout_secs: default_idle_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_max_sockets() -> usize {
    50
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Tool catalog injection and budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Inject the built-in catalog into requests for local-family
    /// providers. Cloud families always receive the catalog when the
    /// request declares no tools.
    #[serde(default)]
    pub inject_for_local: bool,

    /// Token budget for injected tool schemas (~175 tokens per tool).
    #[serde(default = "default_tool_token_budget")]
    pub token_budget: u32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            inject_for_local: false,
            token_budget: default_tool_token_budget(),
        }
    }
}

fn default_tool_token_budget() -> u32 {
    2000
}

/// Long-term memory subsystem parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable extraction and prompt augmentation.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Data directory holding the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Database file name, relative to `data_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Candidates below this surprise score are discarded.
    #[serde(default = "default_surprise_threshold")]
    pub surprise_threshold: f64,

    /// Number of recent same-session memories surprise is computed against.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Number of recent memories consulted for duplicate suppression.
    #[serde(default = "default_dedup_lookback")]
    pub dedup_lookback: usize,

    /// Half-life of the exponential decay, in days.
    #[serde(default = "default_decay_half_life_days")]
    pub decay_half_life_days: f64,

    /// Records older than this are eligible for eviction.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Soft cap on stored records; maintenance evicts the lowest-scored
    /// beyond it.
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// Minutes between background decay maintenance runs.
    #[serde(default = "default_decay_interval_mins")]
    pub decay_interval_mins: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
            surprise_threshold: default_surprise_threshold(),
            recent_window: default_recent_window(),
            dedup_lookback: default_dedup_lookback(),
            decay_half_life_days: default_decay_half_life_days(),
            max_age_days: default_max_age_days(),
            max_count: default_max_count(),
            decay_interval_mins: default_decay_interval_mins(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_data_dir() -> String {
    ".".to_string()
}

fn default_database_file() -> String {
    "sessions.db".to_string()
}

fn default_surprise_threshold() -> f64 {
    0.3
}

fn default_recent_window() -> usize {
    100
}

fn default_dedup_lookback() -> usize {
    5
}

fn default_decay_half_life_days() -> f64 {
    30.0
}

fn default_max_age_days() -> u32 {
    180
}

fn default_max_count() -> usize {
    10_000
}

fn default_decay_interval_mins() -> u64 {
    60
}

/// Metrics and cost-savings estimation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Would-have-been cloud rate in USD per million tokens, charged as
    /// savings when a request lands on a local provider.
    #[serde(default = "default_cloud_rate_per_mtok")]
    pub cloud_rate_per_mtok: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cloud_rate_per_mtok: default_cloud_rate_per_mtok(),
        }
    }
}

fn default_cloud_rate_per_mtok() -> f64 {
    3.0
}
