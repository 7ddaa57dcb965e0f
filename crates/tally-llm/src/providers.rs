//! Provider adapters
//!
//! Each adapter normalizes one vendor's chat-completion API into the common
//! `complete(options, messages) -> CompletionResponse` contract. Adapters
//! never retry (failover owns that) and never return empty content — an
//! empty or missing choice is an [`LlmError::InvalidResponse`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CallOptions, ProviderKind};
use crate::error::{LlmError, Result};
use crate::types::{CompletionResponse, Message, TokenUsage};

/// Trait implemented by every vendor adapter
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &'static str;

    /// Provider family this adapter serves
    fn kind(&self) -> ProviderKind;

    /// Base URL used when the instance does not override it
    fn default_base_url(&self) -> &'static str;

    /// Shared HTTP client
    fn http(&self) -> &reqwest::Client;

    /// Run one chat completion
    async fn complete(
        &self,
        opts: &CallOptions,
        messages: &[Message],
    ) -> Result<CompletionResponse>;

    /// Cheap availability probe used by the health checker.
    ///
    /// The default hits the bearer-authenticated models listing, which every
    /// OpenAI-style vendor exposes. Providers without a usable
    /// auth-verification endpoint must override this with a minimal
    /// completion call instead.
    async fn probe(&self, opts: &CallOptions) -> Result<()> {
        let url = format!("{}/models", opts.resolved_base_url(self.default_base_url()));
        let response = self
            .http()
            .get(&url)
            .bearer_auth(&opts.api_key)
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(LlmError::from_status(status.as_u16(), &body))
        }
    }
}

/// Registry with one adapter per supported provider family
pub fn default_registry() -> HashMap<ProviderKind, Arc<dyn ChatProvider>> {
    let mut registry: HashMap<ProviderKind, Arc<dyn ChatProvider>> = HashMap::new();
    registry.insert(ProviderKind::OpenAi, Arc::new(OpenAiProvider::new()));
    registry.insert(ProviderKind::SiliconFlow, Arc::new(SiliconFlowProvider::new()));
    registry.insert(ProviderKind::Deepseek, Arc::new(DeepseekProvider::new()));
    registry.insert(ProviderKind::Anthropic, Arc::new(AnthropicProvider::new()));
    registry.insert(ProviderKind::Custom, Arc::new(CustomProvider::new()));
    registry
}

// ============================================================================
// OpenAI-style wire format (shared by OpenAI, SiliconFlow, Deepseek, Custom)
// ============================================================================

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAiChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChatChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChatChoice {
    message: OpenAiChatMessage,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// One `POST {base}/chat/completions` round trip with envelope normalization
async fn openai_chat(
    client: &reqwest::Client,
    base_url: &str,
    opts: &CallOptions,
    messages: &[Message],
) -> Result<CompletionResponse> {
    let request = OpenAiChatRequest {
        model: opts.model.clone(),
        messages: messages
            .iter()
            .map(|m| OpenAiChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect(),
        temperature: opts.temperature,
        max_tokens: opts.max_tokens,
        stream: false,
    };

    let url = format!("{}/chat/completions", base_url);
    let response = client
        .post(&url)
        .bearer_auth(&opts.api_key)
        .timeout(opts.timeout)
        .json(&request)
        .send()
        .await
        .map_err(LlmError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::from_status(status.as_u16(), &body));
    }

    let envelope: OpenAiChatResponse = response
        .json()
        .await
        .map_err(|e| LlmError::invalid_response(e.to_string()))?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::invalid_response("response contained no choices"))?;

    if content.is_empty() {
        return Err(LlmError::invalid_response("response content was empty"));
    }

    Ok(CompletionResponse {
        content,
        usage: envelope.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        model: envelope.model.or_else(|| Some(opts.model.clone())),
    })
}

macro_rules! openai_style_provider {
    ($name:ident, $display:literal, $kind:expr, $base_url:literal) => {
        pub struct $name {
            client: reqwest::Client,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    client: reqwest::Client::new(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[async_trait]
        impl ChatProvider for $name {
            fn name(&self) -> &'static str {
                $display
            }

            fn kind(&self) -> ProviderKind {
                $kind
            }

            fn default_base_url(&self) -> &'static str {
                $base_url
            }

            fn http(&self) -> &reqwest::Client {
                &self.client
            }

            async fn complete(
                &self,
                opts: &CallOptions,
                messages: &[Message],
            ) -> Result<CompletionResponse> {
                let base = opts.resolved_base_url(self.default_base_url());
                openai_chat(&self.client, &base, opts, messages).await
            }
        }
    };
}

openai_style_provider!(OpenAiProvider, "OpenAI", ProviderKind::OpenAi, "https://api.openai.com/v1");
openai_style_provider!(
    SiliconFlowProvider,
    "SiliconFlow",
    ProviderKind::SiliconFlow,
    "https://api.siliconflow.cn/v1"
);
openai_style_provider!(
    DeepseekProvider,
    "Deepseek",
    ProviderKind::Deepseek,
    "https://api.deepseek.com/v1"
);
// Custom instances always carry their own base URL (validated at config load).
openai_style_provider!(CustomProvider, "Custom", ProviderKind::Custom, "");

// ============================================================================
// Anthropic Provider
// ============================================================================

/// Anthropic Claude adapter (`/v1/messages` API)
pub struct AnthropicProvider {
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<OpenAiChatMessage>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicProvider {
    async fn send(
        &self,
        opts: &CallOptions,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<CompletionResponse> {
        // System messages ride in a dedicated field on this API.
        let system = messages
            .iter()
            .find(|m| m.role == crate::types::MessageRole::System)
            .map(|m| m.content.clone());

        let turns: Vec<OpenAiChatMessage> = messages
            .iter()
            .filter(|m| m.role != crate::types::MessageRole::System)
            .map(|m| OpenAiChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let request = AnthropicRequest {
            model: opts.model.clone(),
            max_tokens,
            temperature,
            system,
            messages: turns,
        };

        let url = format!("{}/v1/messages", opts.resolved_base_url(self.default_base_url()));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &opts.api_key)
            .header("anthropic-version", "2023-06-01")
            .timeout(opts.timeout)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let envelope: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(e.to_string()))?;

        let content = envelope
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| LlmError::invalid_response("response contained no content blocks"))?;

        if content.is_empty() {
            return Err(LlmError::invalid_response("response content was empty"));
        }

        Ok(CompletionResponse {
            content,
            usage: envelope.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            model: envelope.model.or_else(|| Some(opts.model.clone())),
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.anthropic.com"
    }

    fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn complete(
        &self,
        opts: &CallOptions,
        messages: &[Message],
    ) -> Result<CompletionResponse> {
        self.send(opts, messages, opts.max_tokens, opts.temperature).await
    }

    /// No bearer-auth models listing here; verify the credential with the
    /// smallest possible completion instead.
    async fn probe(&self, opts: &CallOptions) -> Result<()> {
        let ping = [Message::user("ping")];
        self.send(opts, &ping, 1, 0.0).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_kind() {
        let registry = default_registry();
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::SiliconFlow,
            ProviderKind::Deepseek,
            ProviderKind::Anthropic,
            ProviderKind::Custom,
        ] {
            let adapter = registry.get(&kind).expect("adapter registered");
            assert_eq!(adapter.kind(), kind);
        }
    }
}
