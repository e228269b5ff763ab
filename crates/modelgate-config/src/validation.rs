// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: provider identifiers must be known, local providers may not
//! serve as fallbacks, and tier routing is all-or-nothing.

use std::str::FromStr;

use modelgate_core::{ProviderId, RoutingMode};

use crate::model::ModelgateConfig;

/// Routing configuration after provider identifiers have been parsed and
/// cross-field constraints checked.
#[derive(Debug, Clone)]
pub struct ResolvedRouting {
    /// Primary provider.
    pub primary: ProviderId,
    /// Routing mode controlling the complexity threshold.
    pub mode: RoutingMode,
    /// Tier table; `None` disables tier routing entirely.
    pub tiers: Option<TierTable>,
    /// Fallback provider; `None` when fallback is disabled.
    pub fallback: Option<ProviderId>,
}

/// One `provider:model` pair per complexity tier.
#[derive(Debug, Clone)]
pub struct TierTable {
    pub simple: (ProviderId, String),
    pub medium: (ProviderId, String),
    pub complex: (ProviderId, String),
    pub reasoning: (ProviderId, String),
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns the resolved routing on success, or all collected validation
/// errors (does not fail fast).
pub fn validate_config(config: &ModelgateConfig) -> Result<ResolvedRouting, Vec<String>> {
    let mut errors = Vec::new();

    let primary = match parse_provider(&config.routing.provider) {
        Ok(p) => Some(p),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let mode = match parse_mode(&config.routing.mode) {
        Ok(m) => Some(m),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let fallback = if config.routing.fallback_enabled {
        match &config.routing.fallback_provider {
            Some(raw) => match parse_provider(raw) {
                Ok(p) if p.is_local() => {
                    errors.push(format!(
                        "routing.fallback_provider `{p}` is a local provider; local providers cannot serve as fallbacks"
                    ));
                    None
                }
                Ok(p) => Some(p),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => {
                errors.push(
                    "routing.fallback_enabled requires routing.fallback_provider".to_string(),
                );
                None
            }
        }
    } else {
        None
    };

    // Tier routing: enabled only when all four tiers are set. A partial
    // tier table is reported so the operator knows tier mode is off.
    let tier_fields = [
        ("tier_simple", &config.routing.tier_simple),
        ("tier_medium", &config.routing.tier_medium),
        ("tier_complex", &config.routing.tier_complex),
        ("tier_reasoning", &config.routing.tier_reasoning),
    ];
    let set_count = tier_fields.iter().filter(|(_, v)| v.is_some()).count();
    let tiers = if set_count == 4 {
        let mut parsed = Vec::new();
        for (name, value) in &tier_fields {
            let Some(raw) = value else { continue };
            match parse_tier(raw) {
                Ok(pair) => parsed.push(pair),
                Err(e) => errors.push(format!("routing.{name}: {e}")),
            }
        }
        if parsed.len() == 4 {
            let mut it = parsed.into_iter();
            Some(TierTable {
                simple: it.next().unwrap(),
                medium: it.next().unwrap(),
                complex: it.next().unwrap(),
                reasoning: it.next().unwrap(),
            })
        } else {
            None
        }
    } else {
        None
    };

    // Provider table keys must themselves be known identifiers.
    for key in config.providers.keys() {
        if let Err(e) = parse_provider(key) {
            errors.push(format!("[providers.{key}]: {e}"));
        }
    }

    if config.retry.max_attempts < 1 {
        errors.push(format!(
            "retry.max_attempts must be at least 1, got {}",
            config.retry.max_attempts
        ));
    }

    if config.breaker.failure_threshold < 1 {
        errors.push(format!(
            "breaker.failure_threshold must be at least 1, got {}",
            config.breaker.failure_threshold
        ));
    }

    if config.breaker.success_threshold < 1 {
        errors.push(format!(
            "breaker.success_threshold must be at least 1, got {}",
            config.breaker.success_threshold
        ));
    }

    if !(0.0..=1.0).contains(&config.memory.surprise_threshold) {
        errors.push(format!(
            "memory.surprise_threshold must be in [0, 1], got {}",
            config.memory.surprise_threshold
        ));
    }

    if errors.is_empty() {
        Ok(ResolvedRouting {
            primary: primary.expect("validated"),
            mode: mode.expect("validated"),
            tiers,
            fallback,
        })
    } else {
        Err(errors)
    }
}

/// Parse a provider identifier, listing valid values on failure.
pub fn parse_provider(raw: &str) -> Result<ProviderId, String> {
    ProviderId::from_str(raw.trim()).map_err(|_| {
        format!(
            "unknown provider `{raw}`; valid values: {}",
            ProviderId::valid_values()
        )
    })
}

/// Parse a routing mode string.
pub fn parse_mode(raw: &str) -> Result<RoutingMode, String> {
    match raw.trim() {
        "aggressive" => Ok(RoutingMode::Aggressive),
        "heuristic" => Ok(RoutingMode::Heuristic),
        "conservative" => Ok(RoutingMode::Conservative),
        other => Err(format!(
            "unknown routing mode `{other}`; valid values: aggressive, heuristic, conservative"
        )),
    }
}

/// Parse a `provider:model` tier setting.
pub fn parse_tier(raw: &str) -> Result<(ProviderId, String), String> {
    let (provider_part, model_part) = raw
        .split_once(':')
        .ok_or_else(|| format!("tier setting `{raw}` must be of the form provider:model"))?;
    let provider = parse_provider(provider_part)?;
    let model = model_part.trim();
    if model.is_empty() {
        return Err(format!("tier setting `{raw}` has an empty model"));
    }
    Ok((provider, model.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn default_config_validates() {
        let config = ModelgateConfig::default();
        let resolved = validate_config(&config).unwrap();
        assert_eq!(resolved.primary, ProviderId::Openai);
        assert_eq!(resolved.mode, RoutingMode::Heuristic);
        assert!(resolved.tiers.is_none());
        assert!(resolved.fallback.is_none());
    }

    #[test]
    fn unknown_provider_lists_valid_values() {
        let mut config = ModelgateConfig::default();
        config.routing.provider = "gpt-cloud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.contains("unknown provider") && e.contains("ollama")));
    }

    #[test]
    fn local_fallback_is_rejected() {
        let mut config = ModelgateConfig::default();
        config.routing.fallback_enabled = true;
        config.routing.fallback_provider = Some("ollama".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.contains("local providers cannot serve as fallbacks")));
    }

    #[test]
    fn fallback_enabled_requires_provider() {
        let mut config = ModelgateConfig::default();
        config.routing.fallback_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("fallback_provider")));
    }

    #[test]
    fn partial_tiers_disable_tier_mode() {
        let mut config = ModelgateConfig::default();
        config.routing.tier_simple = Some("ollama:llama3".to_string());
        config.routing.tier_complex = Some("openai:gpt-4o".to_string());
        let resolved = validate_config(&config).unwrap();
        assert!(resolved.tiers.is_none());
    }

    #[test]
    fn full_tiers_enable_tier_mode() {
        let mut config = ModelgateConfig::default();
        config.routing.tier_simple = Some("ollama:llama3".to_string());
        config.routing.tier_medium = Some("ollama:llama3:70b".to_string());
        config.routing.tier_complex = Some("openai:gpt-4o".to_string());
        config.routing.tier_reasoning = Some("openai:o3".to_string());
        let resolved = validate_config(&config).unwrap();
        let tiers = resolved.tiers.unwrap();
        assert_eq!(tiers.simple.0, ProviderId::Ollama);
        assert_eq!(tiers.simple.1, "llama3");
        // Model part may itself contain colons (ollama tags).
        assert_eq!(tiers.medium.1, "llama3:70b");
        assert_eq!(tiers.reasoning.0, ProviderId::Openai);
    }

    #[test]
    fn tier_without_colon_is_rejected() {
        let err = parse_tier("just-a-model").unwrap_err();
        assert!(err.contains("provider:model"));
    }

    #[test]
    fn unknown_provider_section_key_is_rejected() {
        let config = load_config_from_str(
            r#"
[providers.frobnicator]
endpoint = "http://localhost:1234"
"#,
        )
        .unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("providers.frobnicator")));
    }

    #[test]
    fn surprise_threshold_out_of_range_fails() {
        let mut config = ModelgateConfig::default();
        config.memory.surprise_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("surprise_threshold")));
    }

    #[test]
    fn zero_retry_attempts_fails() {
        let mut config = ModelgateConfig::default();
        config.retry.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_attempts")));
    }
}
