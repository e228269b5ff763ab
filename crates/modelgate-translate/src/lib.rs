// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Format translation between the canonical Messages shape and upstream
//! provider wire formats.
//!
//! Four translation pairs, all pure functions over owned data:
//! canonical ⇄ OpenAI chat-completions, canonical ⇄ Bedrock Converse,
//! canonical ⇄ native Ollama, and the Responses input-shape shim. Plus the
//! built-in tool catalog with per-provider schema conversion, and the
//! consecutive same-role compaction applied for local-family targets.

pub mod bedrock;
pub mod compact;
pub mod ollama;
pub mod openai;
pub mod responses;
pub mod tools;

pub use compact::{compact_ollama_messages, compact_openai_messages};
pub use responses::{responses_to_canonical, ResponsesRequest};
pub use tools::{default_catalog, effective_tools, to_ollama_tools, to_openai_tools};
