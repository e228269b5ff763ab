// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consecutive same-role compaction for local-family targets.
//!
//! Local servers (Ollama, llama.cpp) reject consecutive messages with the
//! same role. As a last-resort normalization, adjacent same-role messages
//! are merged by concatenating their content with a single newline
//! separator -- merging preserves text where dropping would lose it. The
//! merge is logged but never an error.

use tracing::warn;

use crate::ollama::OllamaChatMessage;
use crate::openai::OpenAiMessage;

/// Merge consecutive same-role messages in an OpenAI-shape sequence.
///
/// `tool` messages are exempt: they answer distinct tool_call ids and
/// upstream accepts runs of them.
pub fn compact_openai_messages(messages: Vec<OpenAiMessage>) -> Vec<OpenAiMessage> {
    let mut out: Vec<OpenAiMessage> = Vec::with_capacity(messages.len());

    for msg in messages {
        match out.last_mut() {
            Some(prev) if prev.role == msg.role && msg.role != "tool" => {
                warn!(role = %msg.role, "merging consecutive same-role messages");
                prev.content = Some(merge_text(
                    prev.content.as_deref(),
                    msg.content.as_deref(),
                ));
                if let Some(calls) = msg.tool_calls {
                    prev.tool_calls
                        .get_or_insert_with(Vec::new)
                        .extend(calls);
                }
            }
            _ => out.push(msg),
        }
    }

    out
}

/// Merge consecutive same-role messages in a native Ollama sequence.
pub fn compact_ollama_messages(messages: Vec<OllamaChatMessage>) -> Vec<OllamaChatMessage> {
    let mut out: Vec<OllamaChatMessage> = Vec::with_capacity(messages.len());

    for msg in messages {
        match out.last_mut() {
            Some(prev) if prev.role == msg.role && msg.role != "tool" => {
                warn!(role = %msg.role, "merging consecutive same-role messages");
                prev.content = merge_text(Some(&prev.content), Some(&msg.content));
                if let Some(calls) = msg.tool_calls {
                    prev.tool_calls
                        .get_or_insert_with(Vec::new)
                        .extend(calls);
                }
            }
            _ => out.push(msg),
        }
    }

    out
}

/// Join two optional text contents with a single newline, skipping empties.
fn merge_text(a: Option<&str>, b: Option<&str>) -> String {
    match (a.unwrap_or(""), b.unwrap_or("")) {
        ("", b) => b.to_string(),
        (a, "") => a.to_string(),
        (a, b) => format!("{a}\n{b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai(role: &str, content: &str) -> OpenAiMessage {
        OpenAiMessage {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn ollama(role: &str, content: &str) -> OllamaChatMessage {
        OllamaChatMessage {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
        }
    }

    #[test]
    fn distinct_roles_pass_through() {
        let out = compact_openai_messages(vec![
            openai("user", "a"),
            openai("assistant", "b"),
            openai("user", "c"),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn consecutive_user_messages_merge_with_newline() {
        let out = compact_openai_messages(vec![
            openai("user", "first"),
            openai("user", "second"),
            openai("assistant", "reply"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content.as_deref(), Some("first\nsecond"));
        assert_eq!(out[1].role, "assistant");
    }

    #[test]
    fn triple_run_collapses_to_one() {
        let out = compact_openai_messages(vec![
            openai("user", "a"),
            openai("user", "b"),
            openai("user", "c"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content.as_deref(), Some("a\nb\nc"));
    }

    #[test]
    fn empty_content_does_not_add_separator() {
        let out = compact_openai_messages(vec![openai("assistant", ""), openai("assistant", "x")]);
        assert_eq!(out[0].content.as_deref(), Some("x"));
    }

    #[test]
    fn tool_messages_are_exempt() {
        let mut first = openai("tool", "result one");
        first.tool_call_id = Some("t1".into());
        let mut second = openai("tool", "result two");
        second.tool_call_id = Some("t2".into());

        let out = compact_openai_messages(vec![first, second]);
        assert_eq!(out.len(), 2, "tool messages answer distinct call ids");
    }

    #[test]
    fn tool_calls_arrays_merge() {
        use crate::openai::{OpenAiFunctionCall, OpenAiToolCall};

        let mut first = openai("assistant", "");
        first.tool_calls = Some(vec![OpenAiToolCall {
            id: "c1".into(),
            call_type: "function".into(),
            function: OpenAiFunctionCall {
                name: "Read".into(),
                arguments: "{}".into(),
            },
        }]);
        let mut second = openai("assistant", "");
        second.tool_calls = Some(vec![OpenAiToolCall {
            id: "c2".into(),
            call_type: "function".into(),
            function: OpenAiFunctionCall {
                name: "Grep".into(),
                arguments: "{}".into(),
            },
        }]);

        let out = compact_openai_messages(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tool_calls.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn ollama_sequence_never_has_adjacent_same_roles() {
        let out = compact_ollama_messages(vec![
            ollama("system", "sys"),
            ollama("user", "a"),
            ollama("user", "b"),
            ollama("assistant", "r"),
            ollama("assistant", "s"),
        ]);
        assert_eq!(out.len(), 3);
        for pair in out.windows(2) {
            assert_ne!(pair[0].role, pair[1].role);
        }
        assert_eq!(out[1].content, "a\nb");
        assert_eq!(out[2].content, "r\ns");
    }
}
