// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the modelgate gateway.
//!
//! Layered TOML loading via Figment (system > user XDG > local directory)
//! with `MODELGATE_*` environment variable overrides, plus post-load
//! semantic validation of provider identifiers, fallback constraints, and
//! tier settings.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BreakerConfig, MemoryConfig, MetricsConfig, ModelgateConfig, PoolConfig, ProviderSettings,
    RetryConfig, RoutingConfig, ServerConfig, ToolsConfig,
};
pub use validation::{validate_config, ResolvedRouting, TierTable};
