// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical ⇄ OpenAI chat-completions translation.
//!
//! Covers every provider in the OpenAI-chat family (OpenAI, Azure
//! deployments, OpenRouter, LM Studio, llama.cpp-server) and the Azure
//! Responses variant, which differs only in using `max_completion_tokens`.
//!
//! The reverse direction carries the local-model cleanup rules: tool-call
//! JSON leaked into text content is suppressed when real tool_calls are
//! present, and emptied when they are not.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use modelgate_core::{
    CanonicalMessage, CanonicalRequest, CanonicalResponse, ContentBlock, GatewayError, Role,
    StopReason, Usage,
};

// --- Request types ---

/// An OpenAI chat-completions request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChatRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Standard chat-completions token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Azure Responses surface uses this name instead of `max_tokens`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,

    pub stream: bool,
}

/// A single message in the chat-completions conversation format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,

    /// Set on `tool` role messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: OpenAiFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// The function payload of a tool call; `arguments` is JSON-serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool declaration in OpenAI function-calling shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAiFunction,
}

/// The function half of an OpenAI tool declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

// --- Response types ---

/// An OpenAI chat-completions response body.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

/// One completion choice; only index 0 is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message within a choice.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

/// Token usage in OpenAI naming.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Options controlling request translation per provider family quirks.
#[derive(Debug, Clone, Default)]
pub struct OpenAiOptions {
    /// Emit `max_completion_tokens` instead of `max_tokens` (Azure Responses).
    pub use_max_completion_tokens: bool,
}

// --- Canonical -> OpenAI ---

/// Translate a canonical request into an OpenAI chat-completions request.
///
/// `upstream_model` is the model/deployment name actually sent upstream,
/// which may differ from the caller-requested one.
pub fn to_openai_request(
    request: &CanonicalRequest,
    upstream_model: &str,
    tools: Option<Vec<OpenAiTool>>,
    opts: &OpenAiOptions,
) -> OpenAiChatRequest {
    let messages = to_openai_messages(request.system.as_deref(), &request.messages);

    let (max_tokens, max_completion_tokens) = if opts.use_max_completion_tokens {
        (None, Some(request.max_tokens))
    } else {
        (Some(request.max_tokens), None)
    };

    OpenAiChatRequest {
        model: upstream_model.to_string(),
        messages,
        tools,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens,
        max_completion_tokens,
        stream: request.stream,
    }
}

/// Translate canonical messages into the chat-completions sequence.
///
/// Text blocks are concatenated with newline separators. Assistant
/// tool_use blocks become a `tool_calls` array; user tool_result blocks
/// become standalone `tool` role messages. Orphan tool_results (no
/// preceding matching tool_use in the emitted sequence) are dropped.
pub fn to_openai_messages(
    system: Option<&str>,
    messages: &[CanonicalMessage],
) -> Vec<OpenAiMessage> {
    let mut out = Vec::new();
    let mut seen_tool_ids: HashSet<String> = HashSet::new();

    if let Some(sys) = system {
        out.push(OpenAiMessage {
            role: "system".to_string(),
            content: Some(sys.to_string()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for msg in messages {
        match msg.role {
            Role::System => {
                out.push(OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(msg.content.text()),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
            Role::Assistant => {
                let mut texts: Vec<&str> = Vec::new();
                let mut calls: Vec<OpenAiToolCall> = Vec::new();
                let blocks = msg.content.as_blocks();
                for block in &blocks {
                    match block {
                        ContentBlock::Text { text } => texts.push(text),
                        ContentBlock::ToolUse { id, name, input } => {
                            seen_tool_ids.insert(id.clone());
                            calls.push(OpenAiToolCall {
                                id: id.clone(),
                                call_type: "function".to_string(),
                                function: OpenAiFunctionCall {
                                    name: name.clone(),
                                    arguments: serde_json::to_string(input)
                                        .unwrap_or_else(|_| "{}".to_string()),
                                },
                            });
                        }
                        ContentBlock::ToolResult { tool_use_id, .. } => {
                            warn!(tool_use_id, "dropping tool_result on assistant turn");
                        }
                    }
                }
                out.push(OpenAiMessage {
                    role: "assistant".to_string(),
                    content: Some(texts.join("\n")),
                    tool_calls: if calls.is_empty() { None } else { Some(calls) },
                    tool_call_id: None,
                });
            }
            Role::User => {
                let mut texts: Vec<&str> = Vec::new();
                let blocks = msg.content.as_blocks();
                for block in &blocks {
                    match block {
                        ContentBlock::Text { text } => texts.push(text),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        } => {
                            if seen_tool_ids.contains(tool_use_id) {
                                out.push(OpenAiMessage {
                                    role: "tool".to_string(),
                                    content: Some(content.clone()),
                                    tool_calls: None,
                                    tool_call_id: Some(tool_use_id.clone()),
                                });
                            } else {
                                warn!(tool_use_id, "dropping orphan tool_result");
                            }
                        }
                        ContentBlock::ToolUse { id, .. } => {
                            warn!(id, "dropping tool_use on user turn");
                        }
                    }
                }
                if !texts.is_empty() {
                    out.push(OpenAiMessage {
                        role: "user".to_string(),
                        content: Some(texts.join("\n")),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
            }
        }
    }

    out
}

// --- OpenAI -> Canonical ---

/// Translate an OpenAI chat-completions response back into canonical form.
///
/// `requested_model` is echoed into the response's `model` field; the
/// upstream-reported model is discarded.
pub fn from_openai_response(
    response: OpenAiChatResponse,
    requested_model: &str,
) -> Result<CanonicalResponse, GatewayError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::MalformedResponse {
            message: "response contained no choices".to_string(),
        })?;

    let mut content: Vec<ContentBlock> = Vec::new();
    let has_tool_calls = choice
        .message
        .tool_calls
        .as_ref()
        .is_some_and(|c| !c.is_empty());

    match &choice.message.content {
        Some(text) if looks_like_tool_call_json(text) => {
            if has_tool_calls {
                // Local-model JSON leakage alongside real tool_calls:
                // the text duplicates the call, drop it.
                debug!("suppressing tool-call JSON leaked into content");
            } else {
                // Tool hallucination with no actual tool_calls: emit an
                // empty text block for round-trip consistency.
                debug!("emptying malformed tool-call JSON content");
                content.push(ContentBlock::Text {
                    text: String::new(),
                });
            }
        }
        Some(text) => {
            content.push(ContentBlock::Text { text: text.clone() });
        }
        None => {
            if !has_tool_calls {
                content.push(ContentBlock::Text {
                    text: String::new(),
                });
            }
        }
    }

    if let Some(calls) = choice.message.tool_calls {
        for call in calls {
            content.push(tool_call_to_block(call));
        }
    }

    let stop_reason = if has_tool_calls {
        StopReason::ToolUse
    } else {
        map_finish_reason(choice.finish_reason.as_deref())
    };

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CanonicalResponse {
        id: generate_message_id(),
        role: Role::Assistant,
        content,
        model: requested_model.to_string(),
        stop_reason,
        usage,
    })
}

/// Convert one upstream tool call into a canonical tool_use block.
///
/// Missing ids get a generated `toolu_` id; unparseable arguments become
/// the empty object.
fn tool_call_to_block(call: OpenAiToolCall) -> ContentBlock {
    let id = if call.id.is_empty() {
        generate_tool_use_id()
    } else {
        call.id
    };
    let input = serde_json::from_str(&call.function.arguments)
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
    ContentBlock::ToolUse {
        id,
        name: call.function.name,
        input,
    }
}

/// Map an OpenAI finish_reason onto the canonical stop reason.
///
/// The mapping is total: unknown or missing values default to end_turn.
pub fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// Whether text content is a JSON object shaped like a tool call:
/// `{"function": …}` or `{"type": "function", …}`.
pub fn looks_like_tool_call_json(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return false;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return false;
    };
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.contains_key("function")
        || obj.get("type").and_then(Value::as_str) == Some("function")
}

/// Generate a `toolu_` id for upstream tool calls that omitted one.
pub fn generate_tool_use_id() -> String {
    format!("toolu_{}", uuid::Uuid::new_v4().simple())
}

/// Generate a canonical message id.
pub fn generate_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}
