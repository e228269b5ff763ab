// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Smart tool selection: per-request pruning of the tool list.
//!
//! The task classification maps to an allowlist of tool names; mode
//! modifiers tighten or loosen it; provider hard caps and a token-budget
//! guard bound the final schema size.

use modelgate_core::{ProviderId, RoutingMode, ToolDefinition};
use tracing::debug;

use crate::analyzer::TaskClass;

/// Estimated schema cost per tool, in tokens.
const TOKENS_PER_TOOL: u32 = 175;

/// Ollama chokes on large tool lists; hard cap.
const OLLAMA_MAX_TOOLS: usize = 8;

/// File-inspection tool names.
const FILE_READING_TOOLS: &[&str] = &["Read", "Grep", "Glob"];

/// Code-modification tool names.
const CODE_WRITING_TOOLS: &[&str] = &["Read", "Write", "Grep", "Glob"];

/// Prune a tool list for one dispatch.
///
/// `class` comes from the complexity analyzer; `mode` applies its
/// modifiers (aggressive trims ambiguous selections, conservative adds a
/// safety tool); the provider cap and token budget trim trailing tools.
pub fn select_tools(
    tools: Vec<ToolDefinition>,
    class: TaskClass,
    mode: RoutingMode,
    provider: ProviderId,
    token_budget: u32,
) -> Vec<ToolDefinition> {
    let mut selected: Vec<ToolDefinition> = match class {
        TaskClass::Conversational => Vec::new(),
        TaskClass::FileReading => retain_named(tools, FILE_READING_TOOLS),
        TaskClass::CodeWriting => retain_named(tools, CODE_WRITING_TOOLS),
        TaskClass::ComplexTask => tools,
        TaskClass::General => match mode {
            // Ambiguous classification: aggressive mode keeps only the
            // read-side tools.
            RoutingMode::Aggressive => retain_named(tools, FILE_READING_TOOLS),
            _ => tools,
        },
    };

    if mode == RoutingMode::Conservative
        && class != TaskClass::Conversational
        && !selected.iter().any(|t| t.name == "Read")
    {
        selected.push(read_safety_tool());
    }

    if provider == ProviderId::Ollama && selected.len() > OLLAMA_MAX_TOOLS {
        debug!(
            dropped = selected.len() - OLLAMA_MAX_TOOLS,
            "applying ollama tool cap"
        );
        selected.truncate(OLLAMA_MAX_TOOLS);
    }

    let budget_max = (token_budget / TOKENS_PER_TOOL) as usize;
    if selected.len() > budget_max {
        debug!(
            dropped = selected.len() - budget_max,
            budget = token_budget,
            "tool schemas exceed token budget"
        );
        selected.truncate(budget_max);
    }

    selected
}

fn retain_named(tools: Vec<ToolDefinition>, names: &[&str]) -> Vec<ToolDefinition> {
    tools
        .into_iter()
        .filter(|t| names.contains(&t.name.as_str()))
        .collect()
}

/// The safety tool added in conservative mode.
fn read_safety_tool() -> ToolDefinition {
    ToolDefinition {
        name: "Read".into(),
        description: "Read a file from the local filesystem".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string", "description": "Absolute path to the file"}
            },
            "required": ["file_path"]
        }),
    }
}
