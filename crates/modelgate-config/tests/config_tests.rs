// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use modelgate_config::{load_config_from_str, validate_config, ModelgateConfig};
use modelgate_core::{ProviderId, RoutingMode};

#[test]
fn empty_config_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8787);
    assert_eq!(config.routing.provider, "openai");
    assert_eq!(config.routing.mode, "heuristic");
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.initial_delay_ms, 1000);
    assert_eq!(config.retry.max_delay_ms, 30_000);
    assert_eq!(config.breaker.failure_threshold, 5);
    assert_eq!(config.breaker.open_timeout_secs, 60);
    assert_eq!(config.breaker.success_threshold, 2);
    assert_eq!(config.pool.max_sockets, 50);
    assert_eq!(config.pool.idle_timeout_secs, 30);
    assert_eq!(config.pool.request_timeout_secs, 60);
    assert!((config.memory.surprise_threshold - 0.3).abs() < f64::EPSILON);
    assert_eq!(config.memory.recent_window, 100);
    assert_eq!(config.memory.dedup_lookback, 5);
    assert!((config.memory.decay_half_life_days - 30.0).abs() < f64::EPSILON);
    assert_eq!(config.memory.database_file, "sessions.db");
}

#[test]
fn full_config_round_trip() {
    let config = load_config_from_str(
        r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[routing]
provider = "ollama"
mode = "aggressive"
fallback_enabled = true
fallback_provider = "openai"

[providers.ollama]
endpoint = "http://localhost:11434"
model = "qwen2.5-coder:14b"

[providers.openai]
api_key = "sk-test"
model = "gpt-4o-mini"
timeout_secs = 90

[retry]
max_attempts = 5
initial_delay_ms = 500

[breaker]
failure_threshold = 3
open_timeout_secs = 30

[memory]
surprise_threshold = 0.5
dedup_lookback = 10

[metrics]
cloud_rate_per_mtok = 5.0
"#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.routing.provider, "ollama");
    assert!(config.routing.fallback_enabled);
    assert_eq!(
        config.providers["ollama"].endpoint.as_deref(),
        Some("http://localhost:11434")
    );
    assert_eq!(config.providers["openai"].timeout_secs, Some(90));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.breaker.failure_threshold, 3);
    assert!((config.memory.surprise_threshold - 0.5).abs() < f64::EPSILON);
    assert!((config.metrics.cloud_rate_per_mtok - 5.0).abs() < f64::EPSILON);

    let resolved = validate_config(&config).unwrap();
    assert_eq!(resolved.primary, ProviderId::Ollama);
    assert_eq!(resolved.mode, RoutingMode::Aggressive);
    assert_eq!(resolved.fallback, Some(ProviderId::Openai));
}

#[test]
fn unknown_section_key_is_rejected() {
    let result = load_config_from_str(
        r#"
[server]
host = "127.0.0.1"
not_a_real_key = true
"#,
    );
    assert!(result.is_err());
}

#[test]
fn unknown_provider_aborts_with_listing() {
    let config = load_config_from_str(
        r#"
[routing]
provider = "skynet"
"#,
    )
    .unwrap();
    let errors = validate_config(&config).unwrap_err();
    let joined = errors.join("; ");
    assert!(joined.contains("unknown provider `skynet`"));
    assert!(joined.contains("openai"));
    assert!(joined.contains("bedrock"));
}

#[test]
fn tier_mode_requires_all_four_settings() {
    let config = load_config_from_str(
        r#"
[routing]
tier_simple = "ollama:llama3"
tier_medium = "ollama:llama3"
tier_complex = "openai:gpt-4o"
"#,
    )
    .unwrap();
    let resolved = validate_config(&config).unwrap();
    assert!(
        resolved.tiers.is_none(),
        "three of four tiers must disable tier mode"
    );
}

#[test]
fn local_fallback_rejected_at_startup() {
    let config = load_config_from_str(
        r#"
[routing]
provider = "ollama"
fallback_enabled = true
fallback_provider = "lmstudio"
"#,
    )
    .unwrap();
    let errors = validate_config(&config).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| e.contains("local providers cannot serve as fallbacks")));
}

#[test]
fn defaults_validate_cleanly() {
    let config = ModelgateConfig::default();
    assert!(validate_config(&config).is_ok());
}
