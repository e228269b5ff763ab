// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider identifiers and wire-format families.
//!
//! Providers are grouped into families that share a wire shape; the
//! dispatcher keys its translation and header-building tables on
//! [`Family`], so adding a provider to an existing family is a one-line
//! change here.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A configured upstream provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    /// api.openai.com chat completions.
    Openai,
    /// Azure OpenAI deployment-scoped chat completions.
    AzureOpenai,
    /// Azure OpenAI Responses API surface.
    AzureResponses,
    /// OpenRouter (OpenAI-compatible).
    Openrouter,
    /// LM Studio local server (OpenAI-compatible).
    Lmstudio,
    /// llama.cpp server (OpenAI-compatible).
    Llamacpp,
    /// Anthropic-compatible REST surface (Azure Anthropic).
    Anthropic,
    /// AWS Bedrock Converse.
    Bedrock,
    /// Native Ollama /api/chat.
    Ollama,
    /// TinyFish SSE browser-automation API.
    Tinyfish,
}

/// A set of providers sharing one wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Family {
    /// OpenAI chat-completions body, `/v1/chat/completions` path shapes.
    OpenaiChat,
    /// OpenAI chat-completions body with `max_completion_tokens`, Responses path.
    AzureResponses,
    /// Canonical Anthropic Messages body.
    AnthropicNative,
    /// Bedrock Converse schema.
    BedrockConverse,
    /// Native Ollama body (string content, Ollama tool schema).
    OllamaNative,
    /// SSE browser-automation endpoint.
    TinyFishSse,
}

impl ProviderId {
    /// The wire-format family this provider belongs to.
    pub fn family(&self) -> Family {
        match self {
            ProviderId::Openai
            | ProviderId::AzureOpenai
            | ProviderId::Openrouter
            | ProviderId::Lmstudio
            | ProviderId::Llamacpp => Family::OpenaiChat,
            ProviderId::AzureResponses => Family::AzureResponses,
            ProviderId::Anthropic => Family::AnthropicNative,
            ProviderId::Bedrock => Family::BedrockConverse,
            ProviderId::Ollama => Family::OllamaNative,
            ProviderId::Tinyfish => Family::TinyFishSse,
        }
    }

    /// Whether this provider runs on the local machine.
    ///
    /// Local providers are eligible for fallback *from* but forbidden as
    /// fallback targets.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ProviderId::Ollama | ProviderId::Llamacpp | ProviderId::Lmstudio
        )
    }

    /// All valid provider identifiers, for startup diagnostics.
    pub fn valid_values() -> String {
        ProviderId::iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn kebab_case_round_trip() {
        for provider in ProviderId::iter() {
            let s = provider.to_string();
            let parsed = ProviderId::from_str(&s).expect("should parse back");
            assert_eq!(provider, parsed);
        }
    }

    #[test]
    fn parses_known_identifiers() {
        assert_eq!(ProviderId::from_str("openai").unwrap(), ProviderId::Openai);
        assert_eq!(
            ProviderId::from_str("azure-openai").unwrap(),
            ProviderId::AzureOpenai
        );
        assert_eq!(ProviderId::from_str("ollama").unwrap(), ProviderId::Ollama);
        assert!(ProviderId::from_str("not-a-provider").is_err());
    }

    #[test]
    fn family_grouping() {
        assert_eq!(ProviderId::Openai.family(), Family::OpenaiChat);
        assert_eq!(ProviderId::Llamacpp.family(), Family::OpenaiChat);
        assert_eq!(ProviderId::AzureResponses.family(), Family::AzureResponses);
        assert_eq!(ProviderId::Anthropic.family(), Family::AnthropicNative);
        assert_eq!(ProviderId::Bedrock.family(), Family::BedrockConverse);
        assert_eq!(ProviderId::Ollama.family(), Family::OllamaNative);
        assert_eq!(ProviderId::Tinyfish.family(), Family::TinyFishSse);
    }

    #[test]
    fn local_providers() {
        assert!(ProviderId::Ollama.is_local());
        assert!(ProviderId::Llamacpp.is_local());
        assert!(ProviderId::Lmstudio.is_local());
        assert!(!ProviderId::Openai.is_local());
        assert!(!ProviderId::Bedrock.is_local());
    }

    #[test]
    fn valid_values_lists_all() {
        let values = ProviderId::valid_values();
        assert!(values.contains("openai"));
        assert!(values.contains("ollama"));
        assert!(values.contains("tinyfish"));
    }
}
