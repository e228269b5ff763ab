// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing decision record attached to responses for observability.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// How the router arrived at its provider choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMethod {
    /// Single configured provider.
    Static,
    /// Analyzer score vs. threshold.
    Complexity,
    /// Score bucket mapped to a tier's provider:model pair.
    Tier,
    /// Primary failed; the fallback provider served the request.
    Fallback,
}

/// Routing aggressiveness, controls the local-vs-cloud threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Threshold 60: prefer local aggressively.
    Aggressive,
    /// Threshold 40: balanced default.
    Heuristic,
    /// Threshold 25: prefer cloud.
    Conservative,
}

impl RoutingMode {
    /// The complexity score at or above which a request goes to cloud.
    pub fn threshold(&self) -> u8 {
        match self {
            RoutingMode::Aggressive => 60,
            RoutingMode::Heuristic => 40,
            RoutingMode::Conservative => 25,
        }
    }
}

/// The structured record of why a given provider was chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The provider that served (or will serve) the request.
    pub provider: ProviderId,
    /// Model override from tier mode, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub method: RouteMethod,
    /// Analyzer total score (0-100).
    pub score: u8,
    /// Threshold in effect for the chosen mode.
    pub threshold: u8,
    pub mode: RoutingMode,
    /// Present when method is Fallback: the primary's failure class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}
