// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request routing for the modelgate gateway.
//!
//! The complexity analyzer scores each request with zero-cost heuristic
//! rules; the router turns that score (plus configuration) into a
//! provider choice; smart tool selection prunes the tool list down to
//! what the classified task actually needs.

pub mod analyzer;
pub mod router;
pub mod selection;

pub use analyzer::{Analysis, ComplexityAnalyzer, ForceClass, Recommendation, TaskClass};
pub use router::ProviderRouter;
pub use selection::select_tools;
