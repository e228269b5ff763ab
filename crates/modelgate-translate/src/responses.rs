// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! "Responses" input-shape shim.
//!
//! The alternate /responses endpoint carries an `input` field instead of
//! `messages`. The shim lowers that shape to chat-completions messages,
//! then to the canonical request the rest of the pipeline consumes.
//! Entries with no salvageable role and payload are dropped; if nothing
//! survives, the request is rejected.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use modelgate_core::{
    CanonicalMessage, CanonicalRequest, ContentBlock, GatewayError, MessageContent, Role,
};

use crate::openai::{OpenAiFunctionCall, OpenAiMessage, OpenAiToolCall};

/// A request in the Responses input shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,

    pub input: ResponsesInput,

    /// System-prompt analogue on this surface.
    #[serde(default)]
    pub instructions: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub top_p: Option<f64>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    #[serde(default)]
    pub stream: bool,
}

/// The `input` field: a bare string or a list of loosely-typed items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesInput {
    Text(String),
    Items(Vec<Value>),
}

/// Lower a Responses-shape request to chat-completions messages.
///
/// A string input becomes a single user message. Array entries are
/// filtered: each needs a valid role plus content, tool_calls, or
/// tool_call_id. Content arrays of `{type: text|input_text, …}` parts are
/// flattened by joining with blank lines.
pub fn responses_to_chat(request: &ResponsesRequest) -> Result<Vec<OpenAiMessage>, GatewayError> {
    let messages = match &request.input {
        ResponsesInput::Text(text) => vec![OpenAiMessage {
            role: "user".to_string(),
            content: Some(text.clone()),
            tool_calls: None,
            tool_call_id: None,
        }],
        ResponsesInput::Items(items) => {
            let mut out = Vec::new();
            for item in items {
                match salvage_item(item) {
                    Some(msg) => out.push(msg),
                    None => warn!("dropping input item with no salvageable role and payload"),
                }
            }
            out
        }
    };

    if messages.is_empty() {
        return Err(GatewayError::InvalidRequest {
            status: 400,
            message: "input contained no valid messages".to_string(),
        });
    }
    Ok(messages)
}

/// Convert a Responses-shape request all the way to canonical form.
pub fn responses_to_canonical(
    request: &ResponsesRequest,
) -> Result<CanonicalRequest, GatewayError> {
    let chat = responses_to_chat(request)?;
    let messages = chat_to_canonical_messages(chat);

    Ok(CanonicalRequest {
        model: request.model.clone(),
        system: request.instructions.clone(),
        messages,
        tools: None,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_output_tokens.unwrap_or(4096),
        stream: request.stream,
        metadata: None,
    })
}

/// Try to turn one loosely-typed input item into a chat message.
fn salvage_item(item: &Value) -> Option<OpenAiMessage> {
    let role = item.get("role").and_then(Value::as_str)?;
    if !matches!(role, "user" | "assistant" | "system" | "tool") {
        return None;
    }

    let content = item.get("content").and_then(flatten_content);
    let tool_calls = item
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let function = c.get("function")?;
                    Some(OpenAiToolCall {
                        id: c
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        call_type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: function.get("name")?.as_str()?.to_string(),
                            arguments: function
                                .get("arguments")
                                .and_then(Value::as_str)
                                .unwrap_or("{}")
                                .to_string(),
                        },
                    })
                })
                .collect::<Vec<_>>()
        })
        .filter(|calls| !calls.is_empty());
    let tool_call_id = item
        .get("tool_call_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    if content.is_none() && tool_calls.is_none() && tool_call_id.is_none() {
        return None;
    }

    Some(OpenAiMessage {
        role: role.to_string(),
        content,
        tool_calls,
        tool_call_id,
    })
}

/// Flatten a content value to a single string.
///
/// Strings pass through; arrays of `{type: text|input_text}` parts join
/// with blank lines; anything else is unsalvageable.
fn flatten_content(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| {
                    let part_type = part.get("type").and_then(Value::as_str)?;
                    if part_type != "text" && part_type != "input_text" {
                        return None;
                    }
                    part.get("text")
                        .or_else(|| part.get("input_text"))
                        .and_then(Value::as_str)
                })
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n\n"))
            }
        }
        _ => None,
    }
}

/// Raise chat-completions messages into canonical messages.
fn chat_to_canonical_messages(chat: Vec<OpenAiMessage>) -> Vec<CanonicalMessage> {
    let mut out = Vec::new();
    for msg in chat {
        match msg.role.as_str() {
            "system" => {
                if let Some(content) = msg.content {
                    out.push(CanonicalMessage::text(Role::System, content));
                }
            }
            "assistant" => {
                let mut blocks = Vec::new();
                if let Some(content) = msg.content {
                    if !content.is_empty() {
                        blocks.push(ContentBlock::Text { text: content });
                    }
                }
                if let Some(calls) = msg.tool_calls {
                    for call in calls {
                        let input = serde_json::from_str(&call.function.arguments)
                            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
                        blocks.push(ContentBlock::ToolUse {
                            id: if call.id.is_empty() {
                                crate::openai::generate_tool_use_id()
                            } else {
                                call.id
                            },
                            name: call.function.name,
                            input,
                        });
                    }
                }
                if blocks.is_empty() {
                    blocks.push(ContentBlock::Text {
                        text: String::new(),
                    });
                }
                out.push(CanonicalMessage {
                    role: Role::Assistant,
                    content: MessageContent::Blocks(blocks),
                });
            }
            "tool" => {
                if let Some(tool_use_id) = msg.tool_call_id {
                    out.push(CanonicalMessage {
                        role: Role::User,
                        content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                            tool_use_id,
                            content: msg.content.unwrap_or_default(),
                        }]),
                    });
                }
            }
            _ => {
                if let Some(content) = msg.content {
                    out.push(CanonicalMessage::text(Role::User, content));
                }
            }
        }
    }
    out
}
