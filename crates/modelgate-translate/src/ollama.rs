// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical ⇄ native Ollama /api/chat translation.
//!
//! Ollama's native format carries content as a plain string and tool-call
//! `arguments` as a JSON object (where OpenAI serializes them to a string).
//! Tool-call ids do not exist on this wire; canonical ids are generated on
//! the way back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use modelgate_core::{
    CanonicalMessage, CanonicalRequest, CanonicalResponse, ContentBlock, GatewayError, Role,
    StopReason, Usage,
};

use crate::openai::{generate_message_id, generate_tool_use_id, looks_like_tool_call_json};
use crate::tools::OllamaTool;

// --- Request types ---

/// A native Ollama /api/chat request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OllamaTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// One message in Ollama's chat format. Content is always a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
}

/// A tool call in Ollama's format: no id, arguments as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

/// The function payload; `arguments` is a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Sampling options under Ollama's `options` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Ollama's name for the output token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

// --- Response types ---

/// A native Ollama /api/chat response body (non-streaming).
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    #[serde(default)]
    pub message: Option<OllamaChatMessage>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: u32,
    #[serde(default)]
    pub eval_count: u32,
}

// --- Canonical -> Ollama ---

/// Translate a canonical request into a native Ollama request.
///
/// The caller applies same-role compaction afterwards; Ollama rejects
/// consecutive messages with the same role.
pub fn to_ollama_request(
    request: &CanonicalRequest,
    upstream_model: &str,
    tools: Option<Vec<OllamaTool>>,
) -> OllamaChatRequest {
    OllamaChatRequest {
        model: upstream_model.to_string(),
        messages: to_ollama_messages(request.system.as_deref(), &request.messages),
        stream: request.stream,
        tools,
        options: Some(OllamaOptions {
            temperature: request.temperature,
            top_p: request.top_p,
            num_predict: Some(request.max_tokens),
        }),
    }
}

/// Translate canonical messages into Ollama's string-content sequence.
pub fn to_ollama_messages(
    system: Option<&str>,
    messages: &[CanonicalMessage],
) -> Vec<OllamaChatMessage> {
    let mut out = Vec::new();
    let mut seen_tool_ids: std::collections::HashSet<String> = std::collections::HashSet::new();

    if let Some(sys) = system {
        out.push(OllamaChatMessage {
            role: "system".to_string(),
            content: sys.to_string(),
            tool_calls: None,
        });
    }

    for msg in messages {
        match msg.role {
            Role::System => out.push(OllamaChatMessage {
                role: "system".to_string(),
                content: msg.content.text(),
                tool_calls: None,
            }),
            Role::Assistant => {
                let mut texts: Vec<String> = Vec::new();
                let mut calls: Vec<OllamaToolCall> = Vec::new();
                for block in msg.content.as_blocks() {
                    match block {
                        ContentBlock::Text { text } => texts.push(text),
                        ContentBlock::ToolUse { id, name, input } => {
                            seen_tool_ids.insert(id);
                            calls.push(OllamaToolCall {
                                function: OllamaFunctionCall {
                                    name,
                                    arguments: input,
                                },
                            });
                        }
                        ContentBlock::ToolResult { tool_use_id, .. } => {
                            warn!(tool_use_id, "dropping tool_result on assistant turn");
                        }
                    }
                }
                out.push(OllamaChatMessage {
                    role: "assistant".to_string(),
                    content: texts.join("\n"),
                    tool_calls: if calls.is_empty() { None } else { Some(calls) },
                });
            }
            Role::User => {
                let mut texts: Vec<String> = Vec::new();
                for block in msg.content.as_blocks() {
                    match block {
                        ContentBlock::Text { text } => texts.push(text),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        } => {
                            if seen_tool_ids.contains(&tool_use_id) {
                                out.push(OllamaChatMessage {
                                    role: "tool".to_string(),
                                    content,
                                    tool_calls: None,
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
                    out.push(OllamaChatMessage {
                        role: "user".to_string(),
                        content: texts.join("\n"),
                        tool_calls: None,
                    });
                }
            }
        }
    }

    out
}

// --- Ollama -> Canonical ---

/// Translate a native Ollama response back into canonical form.
///
/// Applies the same local-model content cleanup as the OpenAI direction:
/// tool-call JSON leaked into content is suppressed or emptied.
pub fn from_ollama_response(
    response: OllamaChatResponse,
    requested_model: &str,
) -> Result<CanonicalResponse, GatewayError> {
    let message = response
        .message
        .ok_or_else(|| GatewayError::MalformedResponse {
            message: "response contained no message".to_string(),
        })?;

    let has_tool_calls = message.tool_calls.as_ref().is_some_and(|c| !c.is_empty());
    let mut content: Vec<ContentBlock> = Vec::new();

    if looks_like_tool_call_json(&message.content) {
        if has_tool_calls {
            debug!("suppressing tool-call JSON leaked into content");
        } else {
            debug!("emptying malformed tool-call JSON content");
            content.push(ContentBlock::Text {
                text: String::new(),
            });
        }
    } else if !message.content.is_empty() {
        content.push(ContentBlock::Text {
            text: message.content,
        });
    } else if !has_tool_calls {
        content.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    if let Some(calls) = message.tool_calls {
        for call in calls {
            content.push(ContentBlock::ToolUse {
                id: generate_tool_use_id(),
                name: call.function.name,
                input: call.function.arguments,
            });
        }
    }

    let stop_reason = if has_tool_calls {
        StopReason::ToolUse
    } else {
        match response.done_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        }
    };

    Ok(CanonicalResponse {
        id: generate_message_id(),
        role: Role::Assistant,
        content,
        model: requested_model.to_string(),
        stop_reason,
        usage: Usage {
            input_tokens: response.prompt_eval_count,
            output_tokens: response.eval_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::MessageContent;

    #[test]
    fn request_uses_string_content_and_num_predict() {
        let request = CanonicalRequest {
            model: "qwen2.5-coder:14b".into(),
            system: Some("Be brief.".into()),
            messages: vec![CanonicalMessage::text(Role::User, "Hello")],
            tools: None,
            temperature: Some(0.2),
            top_p: None,
            max_tokens: 256,
            stream: false,
            metadata: None,
        };
        let api = to_ollama_request(&request, "qwen2.5-coder:14b", None);
        assert_eq!(api.messages.len(), 2);
        assert_eq!(api.messages[0].role, "system");
        assert_eq!(api.messages[1].content, "Hello");
        assert_eq!(api.options.as_ref().unwrap().num_predict, Some(256));
    }

    #[test]
    fn tool_use_arguments_stay_structured() {
        let messages = vec![CanonicalMessage {
            role: Role::Assistant,
            content: MessageContent::Blocks(vec![ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "Read".into(),
                input: serde_json::json!({"file_path": "/a"}),
            }]),
        }];
        let out = to_ollama_messages(None, &messages);
        let calls = out[0].tool_calls.as_ref().unwrap();
        assert_eq!(
            calls[0].function.arguments,
            serde_json::json!({"file_path": "/a"})
        );
    }

    #[test]
    fn tool_result_becomes_tool_role_message() {
        let messages = vec![
            CanonicalMessage {
                role: Role::Assistant,
                content: MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: "toolu_1".into(),
                    name: "Read".into(),
                    input: Value::Null,
                }]),
            },
            CanonicalMessage {
                role: Role::User,
                content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_1".into(),
                    content: "file contents".into(),
                }]),
            },
        ];
        let out = to_ollama_messages(None, &messages);
        assert_eq!(out[1].role, "tool");
        assert_eq!(out[1].content, "file contents");
    }

    #[test]
    fn orphan_tool_result_dropped() {
        let messages = vec![CanonicalMessage {
            role: Role::User,
            content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_ghost".into(),
                content: "stale".into(),
            }]),
        }];
        let out = to_ollama_messages(None, &messages);
        assert!(out.is_empty());
    }

    #[test]
    fn response_with_tool_calls_gets_generated_ids() {
        let response: OllamaChatResponse = serde_json::from_value(serde_json::json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "Read", "arguments": {"file_path": "/a"}}}
                ]
            },
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 4
        }))
        .unwrap();

        let canonical = from_ollama_response(response, "qwen2.5-coder:14b").unwrap();
        assert_eq!(canonical.stop_reason, StopReason::ToolUse);
        assert_eq!(canonical.usage.input_tokens, 10);
        assert_eq!(canonical.usage.output_tokens, 4);
        assert_eq!(canonical.content.len(), 1);
        match &canonical.content[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert!(id.starts_with("toolu_"));
                assert_eq!(name, "Read");
                assert_eq!(*input, serde_json::json!({"file_path": "/a"}));
            }
            other => panic!("expected ToolUse, got {other:?}"),
        }
    }

    #[test]
    fn leaked_tool_json_suppressed_when_calls_present() {
        let leaked = "{\"type\":\"function\",\"function\":{\"name\":\"Write\"}}";
        let response: OllamaChatResponse = serde_json::from_value(serde_json::json!({
            "message": {
                "role": "assistant",
                "content": leaked,
                "tool_calls": [
                    {"function": {"name": "Write", "arguments": {"file_path": "t.c"}}}
                ]
            }
        }))
        .unwrap();

        let canonical = from_ollama_response(response, "m").unwrap();
        assert_eq!(canonical.content.len(), 1);
        assert!(matches!(&canonical.content[0], ContentBlock::ToolUse { .. }));
    }

    #[test]
    fn leaked_tool_json_without_calls_yields_empty_text() {
        let response: OllamaChatResponse = serde_json::from_value(serde_json::json!({
            "message": {
                "role": "assistant",
                "content": "{\"function\":{\"name\":\"Bash\",\"parameters\":{}}}"
            }
        }))
        .unwrap();

        let canonical = from_ollama_response(response, "m").unwrap();
        assert_eq!(
            canonical.content,
            vec![ContentBlock::Text {
                text: String::new()
            }]
        );
    }

    #[test]
    fn missing_message_is_malformed() {
        let response: OllamaChatResponse =
            serde_json::from_value(serde_json::json!({"done": true})).unwrap();
        let err = from_ollama_response(response, "m").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[test]
    fn done_reason_length_maps_to_max_tokens() {
        let response: OllamaChatResponse = serde_json::from_value(serde_json::json!({
            "message": {"role": "assistant", "content": "truncated"},
            "done_reason": "length"
        }))
        .unwrap();
        let canonical = from_ollama_response(response, "m").unwrap();
        assert_eq!(canonical.stop_reason, StopReason::MaxTokens);
    }
}
