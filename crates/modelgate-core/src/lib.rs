// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the modelgate LLM gateway.
//!
//! This crate provides the canonical message types, the error taxonomy,
//! and the provider/family classification used throughout the modelgate
//! workspace. Translation, routing, dispatch, and memory crates all build
//! on the definitions here.

pub mod error;
pub mod provider;
pub mod routing;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, GatewayError};
pub use provider::{Family, ProviderId};
pub use routing::{RouteMethod, RoutingDecision, RoutingMode};
pub use types::{
    CanonicalMessage, CanonicalRequest, CanonicalResponse, ContentBlock, MessageContent, Role,
    StopReason, ToolDefinition, Usage,
};
