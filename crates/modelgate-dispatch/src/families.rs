// SPDX-FileCopyrightText: 2026 Modelgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-family endpoint URLs and authentication headers.
//!
//! Each provider family has a fixed URL template and auth style; dispatch
//! keys off this table so adding a provider to an existing family needs
//! no new wire code.

use modelgate_config::ProviderSettings;
use modelgate_core::{Family, GatewayError, ProviderId};

/// Default Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default Azure OpenAI api-version query value.
const AZURE_API_VERSION: &str = "2024-10-21";

/// A resolved upstream target: URL plus request headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

/// Resolve the endpoint and headers for one provider.
///
/// Missing required endpoint or credential material is a config error,
/// which the dispatcher surfaces without retry or fallback.
pub fn endpoint_for(
    provider: ProviderId,
    settings: &ProviderSettings,
    model: &str,
) -> Result<ProviderEndpoint, GatewayError> {
    let base = |default: Option<&str>| -> Result<String, GatewayError> {
        settings
            .endpoint
            .as_deref()
            .or(default)
            .map(|e| e.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                GatewayError::Config(format!("provider {provider} has no endpoint configured"))
            })
    };
    let require_key = || -> Result<String, GatewayError> {
        settings.api_key.clone().ok_or_else(|| {
            GatewayError::Config(format!("provider {provider} has no api key configured"))
        })
    };

    match provider.family() {
        Family::OpenaiChat => {
            if provider == ProviderId::AzureOpenai {
                let base = base(None)?;
                let key = require_key()?;
                let version = settings.api_version.as_deref().unwrap_or(AZURE_API_VERSION);
                return Ok(ProviderEndpoint {
                    url: format!(
                        "{base}/openai/deployments/{model}/chat/completions?api-version={version}"
                    ),
                    headers: vec![("api-key", key)],
                });
            }

            let default = match provider {
                ProviderId::Openai => Some("https://api.openai.com"),
                ProviderId::Openrouter => Some("https://openrouter.ai/api"),
                ProviderId::Lmstudio => Some("http://localhost:1234"),
                ProviderId::Llamacpp => Some("http://localhost:8080"),
                _ => None,
            };
            let base = base(default)?;
            let mut headers = Vec::new();
            if let Some(key) = &settings.api_key {
                headers.push(("authorization", format!("Bearer {key}")));
            } else if !provider.is_local() {
                return Err(GatewayError::Config(format!(
                    "provider {provider} has no api key configured"
                )));
            }
            Ok(ProviderEndpoint {
                url: format!("{base}/v1/chat/completions"),
                headers,
            })
        }
        Family::AzureResponses => {
            let base = base(None)?;
            let key = require_key()?;
            let version = settings.api_version.as_deref().unwrap_or(AZURE_API_VERSION);
            // services.ai.azure.com endpoints take Bearer; classic
            // resource endpoints take the api-key header.
            let headers = if base.contains("services.ai.azure.com") {
                vec![("authorization", format!("Bearer {key}"))]
            } else {
                vec![("api-key", key)]
            };
            Ok(ProviderEndpoint {
                url: format!("{base}/openai/responses?api-version={version}"),
                headers,
            })
        }
        Family::AnthropicNative => {
            let base = base(None)?;
            let key = require_key()?;
            let version = settings.api_version.as_deref().unwrap_or(ANTHROPIC_VERSION);
            Ok(ProviderEndpoint {
                url: base,
                headers: vec![
                    ("x-api-key", key),
                    ("anthropic-version", version.to_string()),
                ],
            })
        }
        Family::BedrockConverse => {
            let base = base(None)?;
            let key = require_key()?;
            Ok(ProviderEndpoint {
                url: format!("{base}/model/{model}/converse"),
                headers: vec![("authorization", format!("Bearer {key}"))],
            })
        }
        Family::OllamaNative => {
            let base = base(Some("http://localhost:11434"))?;
            Ok(ProviderEndpoint {
                url: format!("{base}/api/chat"),
                headers: vec![],
            })
        }
        Family::TinyFishSse => {
            let base = base(None)?;
            let key = require_key()?;
            Ok(ProviderEndpoint {
                url: base,
                headers: vec![("x-api-key", key)],
            })
        }
    }
}
