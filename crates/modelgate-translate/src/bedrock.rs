// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical ⇄ AWS Bedrock Converse translation.
//!
//! Converse content blocks are single-key objects ({"text": …},
//! {"toolUse": …}, {"toolResult": …}), which maps directly onto an
//! externally-tagged serde enum. System messages are hoisted out of the
//! message array into the top-level `system` field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use modelgate_core::{
    CanonicalRequest, CanonicalResponse, ContentBlock, GatewayError, Role, StopReason,
    ToolDefinition, Usage,
};

use crate::openai::generate_message_id;

// --- Request types ---

/// A Bedrock Converse request body (POST /model/{modelId}/converse).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<ConverseSystemBlock>>,

    pub messages: Vec<ConverseMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ConverseToolConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<ConverseInferenceConfig>,
}

/// A top-level system text block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseSystemBlock {
    pub text: String,
}

/// One conversation message in Converse form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ConverseBlock>,
}

/// A Converse content block: a single-key object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConverseBlock {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "toolUse")]
    ToolUse(ConverseToolUse),
    #[serde(rename = "toolResult")]
    ToolResult(ConverseToolResult),
}

/// `toolUse` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseToolUse {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

/// `toolResult` payload; content is a list of text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseToolResult {
    pub tool_use_id: String,
    pub content: Vec<ConverseToolResultBlock>,
}

/// A block within a toolResult payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConverseToolResultBlock {
    #[serde(rename = "text")]
    Text(String),
}

/// `toolConfig` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseToolConfig {
    pub tools: Vec<ConverseTool>,
}

/// One tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseTool {
    pub tool_spec: ConverseToolSpec,
}

/// The toolSpec payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ConverseInputSchema,
}

/// Tool input schema wrapper: `{"json": <schema>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseInputSchema {
    pub json: Value,
}

/// Sampling parameters in Converse naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseInferenceConfig {
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

// --- Response types ---

/// A Bedrock Converse response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub output: ConverseOutput,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<ConverseUsage>,
}

/// The output wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverseOutput {
    pub message: ConverseMessage,
}

/// Token usage in Converse naming.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

// --- Canonical -> Converse ---

/// Translate a canonical request into a Converse request.
///
/// System messages (the top-level prompt plus any system-role turns) are
/// emitted as the top-level `system` array. Orphan tool_results are
/// dropped, matching the OpenAI-direction normalization.
pub fn to_converse_request(
    request: &CanonicalRequest,
    tools: Option<&[ToolDefinition]>,
) -> ConverseRequest {
    let mut system: Vec<ConverseSystemBlock> = Vec::new();
    if let Some(prompt) = &request.system {
        system.push(ConverseSystemBlock {
            text: prompt.clone(),
        });
    }

    let mut messages: Vec<ConverseMessage> = Vec::new();
    let mut seen_tool_ids: HashSet<String> = HashSet::new();

    for msg in &request.messages {
        if msg.role == Role::System {
            system.push(ConverseSystemBlock {
                text: msg.content.text(),
            });
            continue;
        }

        let mut content: Vec<ConverseBlock> = Vec::new();
        for block in msg.content.as_blocks() {
            match block {
                ContentBlock::Text { text } => content.push(ConverseBlock::Text(text)),
                ContentBlock::ToolUse { id, name, input } => {
                    seen_tool_ids.insert(id.clone());
                    content.push(ConverseBlock::ToolUse(ConverseToolUse {
                        tool_use_id: id,
                        name,
                        input,
                    }));
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content: result,
                } => {
                    if seen_tool_ids.contains(&tool_use_id) {
                        content.push(ConverseBlock::ToolResult(ConverseToolResult {
                            tool_use_id,
                            content: vec![ConverseToolResultBlock::Text(result)],
                        }));
                    } else {
                        warn!(tool_use_id, "dropping orphan tool_result");
                    }
                }
            }
        }

        if content.is_empty() {
            continue;
        }
        messages.push(ConverseMessage {
            role: match msg.role {
                Role::Assistant => "assistant".to_string(),
                _ => "user".to_string(),
            },
            content,
        });
    }

    let tool_config = tools.filter(|t| !t.is_empty()).map(|tools| ConverseToolConfig {
        tools: tools
            .iter()
            .map(|t| ConverseTool {
                tool_spec: ConverseToolSpec {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: ConverseInputSchema {
                        json: t.input_schema.clone(),
                    },
                },
            })
            .collect(),
    });

    ConverseRequest {
        system: if system.is_empty() { None } else { Some(system) },
        messages,
        tool_config,
        inference_config: Some(ConverseInferenceConfig {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        }),
    }
}

// --- Converse -> Canonical ---

/// Translate a Converse response back into canonical form.
pub fn from_converse_response(
    response: ConverseResponse,
    requested_model: &str,
) -> Result<CanonicalResponse, GatewayError> {
    let mut content: Vec<ContentBlock> = Vec::new();
    for block in response.output.message.content {
        match block {
            ConverseBlock::Text(text) => content.push(ContentBlock::Text { text }),
            ConverseBlock::ToolUse(tu) => content.push(ContentBlock::ToolUse {
                id: tu.tool_use_id,
                name: tu.name,
                input: tu.input,
            }),
            ConverseBlock::ToolResult(tr) => {
                // An upstream should never answer with a toolResult; keep
                // the text so nothing is silently lost.
                let text = tr
                    .content
                    .into_iter()
                    .map(|ConverseToolResultBlock::Text(t)| t)
                    .collect::<Vec<_>>()
                    .join("\n");
                content.push(ContentBlock::Text { text });
            }
        }
    }

    if content.is_empty() {
        content.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        })
        .unwrap_or_default();

    Ok(CanonicalResponse {
        id: generate_message_id(),
        role: Role::Assistant,
        content,
        model: requested_model.to_string(),
        stop_reason: map_stop_reason(response.stop_reason.as_deref()),
        usage,
    })
}

/// Map a Converse stopReason onto the canonical stop reason.
pub fn map_stop_reason(stop_reason: Option<&str>) -> StopReason {
    match stop_reason {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("content_filtered") => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}
