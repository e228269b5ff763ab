// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider routing from configuration plus complexity analysis.
//!
//! Two modes: static (one configured provider, with force-pattern escape
//! hatches) and tier-based (the score's bucket selects a provider:model
//! pair). The dispatcher consults `fallback_enabled` / `fallback_provider`
//! when a local primary fails.

use modelgate_config::{ResolvedRouting, TierTable};
use modelgate_core::{ProviderId, RouteMethod, RoutingDecision};
use tracing::info;

use crate::analyzer::{Analysis, ForceClass};

/// Picks the primary provider for each request.
pub struct ProviderRouter {
    routing: ResolvedRouting,
    /// First local provider found in the provider table, used when a
    /// force-local pattern fires under a cloud primary.
    local_provider: Option<ProviderId>,
}

impl ProviderRouter {
    /// Create a router from validated routing config.
    pub fn new(routing: ResolvedRouting, local_provider: Option<ProviderId>) -> Self {
        Self {
            routing,
            local_provider,
        }
    }

    /// Whether a fallback provider is configured and enabled.
    pub fn fallback_enabled(&self) -> bool {
        self.routing.fallback.is_some()
    }

    /// The configured fallback provider, if enabled.
    pub fn fallback_provider(&self) -> Option<ProviderId> {
        self.routing.fallback
    }

    /// The static primary provider.
    pub fn primary(&self) -> ProviderId {
        self.routing.primary
    }

    /// Resolve the provider for a request.
    pub fn route(&self, analysis: &Analysis) -> RoutingDecision {
        if let Some(tiers) = &self.routing.tiers {
            return self.route_by_tier(tiers, analysis);
        }
        self.route_static(analysis)
    }

    fn route_by_tier(&self, tiers: &TierTable, analysis: &Analysis) -> RoutingDecision {
        let (provider, model) = match analysis.total {
            0..=25 => &tiers.simple,
            26..=50 => &tiers.medium,
            51..=75 => &tiers.complex,
            _ => &tiers.reasoning,
        };

        info!(
            provider = %provider,
            model = %model,
            score = analysis.total,
            "tier routing decision"
        );

        RoutingDecision {
            provider: *provider,
            model: Some(model.clone()),
            method: RouteMethod::Tier,
            score: analysis.total,
            threshold: analysis.threshold,
            mode: analysis.mode,
            fallback_reason: None,
        }
    }

    fn route_static(&self, analysis: &Analysis) -> RoutingDecision {
        let primary = self.routing.primary;

        let (provider, method) = match analysis.force {
            Some(ForceClass::Local) if !primary.is_local() => match self.local_provider {
                Some(local) => {
                    info!(provider = %local, "force-local pattern diverted routing");
                    (local, RouteMethod::Complexity)
                }
                None => (primary, RouteMethod::Static),
            },
            Some(ForceClass::Cloud) if primary.is_local() => match self.routing.fallback {
                Some(fallback) => {
                    info!(provider = %fallback, "force-cloud pattern diverted routing");
                    (fallback, RouteMethod::Complexity)
                }
                None => (primary, RouteMethod::Static),
            },
            _ => (primary, RouteMethod::Static),
        };

        RoutingDecision {
            provider,
            model: None,
            method,
            score: analysis.total,
            threshold: analysis.threshold,
            mode: analysis.mode,
            fallback_reason: None,
        }
    }
}
