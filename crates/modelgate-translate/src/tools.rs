// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tool catalog and per-provider schema conversion.
//!
//! The catalog is injected into requests that declare no tools of their
//! own: unconditionally for cloud families, behind a config toggle for
//! local families.

use serde::{Deserialize, Serialize};
use serde_json::json;

use modelgate_core::{Family, ProviderId, ToolDefinition};

use crate::openai::{OpenAiFunction, OpenAiTool};

/// A tool declaration in Ollama's native schema.
///
/// Structurally close to OpenAI's but a distinct wire type: Ollama returns
/// call `arguments` as objects rather than serialized strings, and its
/// server validates this shape separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OllamaToolFunction,
}

/// The function half of an Ollama tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The built-in tool catalog in canonical form.
///
/// Mirrors the default tool surface of the downstream coding-agent CLIs so
/// that a bare request still produces useful tool calls.
pub fn default_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "Read".into(),
            description: "Read a file from the local filesystem".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Absolute path to the file"}
                },
                "required": ["file_path"]
            }),
        },
        ToolDefinition {
            name: "Write".into(),
            description: "Write content to a file, creating or overwriting it".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Absolute path to the file"},
                    "content": {"type": "string", "description": "Content to write"}
                },
                "required": ["file_path", "content"]
            }),
        },
        ToolDefinition {
            name: "Grep".into(),
            description: "Search file contents with a regular expression".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regular expression to search for"},
                    "path": {"type": "string", "description": "Directory to search in"}
                },
                "required": ["pattern"]
            }),
        },
        ToolDefinition {
            name: "Glob".into(),
            description: "Find files matching a glob pattern".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Glob pattern, e.g. **/*.rs"}
                },
                "required": ["pattern"]
            }),
        },
        ToolDefinition {
            name: "Bash".into(),
            description: "Execute a shell command and return its output".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Command to execute"}
                },
                "required": ["command"]
            }),
        },
        ToolDefinition {
            name: "WebFetch".into(),
            description: "Fetch a URL and return its content".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "URL to fetch"}
                },
                "required": ["url"]
            }),
        },
    ]
}

/// Decide the effective tool list for a dispatch.
///
/// Caller-provided tools always win. With zero tools, the catalog is
/// injected for cloud providers unconditionally and for local providers
/// only when `inject_for_local` is set.
pub fn effective_tools(
    declared: Option<&[ToolDefinition]>,
    provider: ProviderId,
    inject_for_local: bool,
) -> Vec<ToolDefinition> {
    match declared {
        Some(tools) if !tools.is_empty() => tools.to_vec(),
        _ => {
            if provider.family() == Family::TinyFishSse {
                // The browser-automation endpoint takes no tool schemas.
                Vec::new()
            } else if provider.is_local() && !inject_for_local {
                Vec::new()
            } else {
                default_catalog()
            }
        }
    }
}

/// Convert canonical tool declarations to OpenAI function-calling shape.
pub fn to_openai_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
    tools
        .iter()
        .map(|t| OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// Convert canonical tool declarations to Ollama's native schema.
pub fn to_ollama_tools(tools: &[ToolDefinition]) -> Vec<OllamaTool> {
    tools
        .iter()
        .map(|t| OllamaTool {
            tool_type: "function".to_string(),
            function: OllamaToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}
