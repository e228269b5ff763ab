// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./modelgate.toml` > `~/.config/modelgate/modelgate.toml`
//! > `/etc/modelgate/modelgate.toml` with environment variable overrides via
//! the `MODELGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ModelgateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/modelgate/modelgate.toml` (system-wide)
/// 3. `~/.config/modelgate/modelgate.toml` (user XDG config)
/// 4. `./modelgate.toml` (local directory)
/// 5. `MODELGATE_*` environment variables
pub fn load_config() -> Result<ModelgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelgateConfig::default()))
        .merge(Toml::file("/etc/modelgate/modelgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("modelgate/modelgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("modelgate.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ModelgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ModelgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example,
/// `MODELGATE_ROUTING_FALLBACK_PROVIDER` must map to
/// `routing.fallback_provider`, not `routing.fallback.provider`.
fn env_provider() -> Env {
    Env::prefixed("MODELGATE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("routing_", "routing.", 1)
            .replacen("providers_", "providers.", 1)
            .replacen("retry_", "retry.", 1)
            .replacen("breaker_", "breaker.", 1)
            .replacen("pool_", "pool.", 1)
            .replacen("tools_", "tools.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("metrics_", "metrics.", 1);
        mapped.into()
    })
}
