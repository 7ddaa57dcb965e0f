//! Common types for LLM interactions

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information as reported by the vendor
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized response from one provider attempt
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated content (never empty; adapters error instead)
    pub content: String,
    /// Token usage, when the vendor reports it
    pub usage: Option<TokenUsage>,
    /// Which model produced the content
    pub model: Option<String>,
}

/// Structured outcome of a routed generation request.
///
/// This is what callers of the orchestration layer receive: either the
/// winning provider's content, or the reason nothing could be produced.
/// Raw adapter errors never cross this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequestResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Instance that served the request (or that produced the final error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
}

impl LlmRequestResult {
    pub fn success(
        response: CompletionResponse,
        provider_id: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            content: Some(response.content),
            provider_id: Some(provider_id.into()),
            model: response.model,
            usage: response.usage,
            error: None,
            response_time_ms,
        }
    }

    pub fn failure(error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            success: false,
            content: None,
            provider_id: None,
            model: None,
            usage: None,
            error: Some(error.into()),
            response_time_ms,
        }
    }

    pub fn failure_from(
        provider_id: impl Into<String>,
        error: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            ..Self::failure(error, response_time_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let m = Message::user("hello");
        assert_eq!(m.role, MessageRole::User);
        assert_eq!(m.content, "hello");
    }

    #[test]
    fn test_result_serde_shape() {
        let result = LlmRequestResult::failure("no providers available", 12);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no providers available");
        assert_eq!(json["responseTimeMs"], 12);
        assert!(json.get("content").is_none());
    }
}
