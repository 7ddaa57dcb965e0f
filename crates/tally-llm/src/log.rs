//! Call logging and token/cost estimation
//!
//! Every routed generation attempt is recorded through a [`CallLogSink`].
//! Logging is best-effort: a failing sink never affects the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::ProviderKind;

/// One recorded generation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub user_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated cost in USD
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Destination for call records (database, queue, ...)
#[async_trait]
pub trait CallLogSink: Send + Sync {
    async fn record(&self, record: CallRecord);
}

/// Sink that drops every record
pub struct NoopCallLog;

#[async_trait]
impl CallLogSink for NoopCallLog {
    async fn record(&self, _record: CallRecord) {}
}

/// Sink that keeps records in memory (tests, embedded dashboards)
#[derive(Default)]
pub struct InMemoryCallLog {
    records: RwLock<Vec<CallRecord>>,
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<CallRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl CallLogSink for InMemoryCallLog {
    async fn record(&self, record: CallRecord) {
        self.records.write().await.push(record);
    }
}

/// Rough token estimate used when the vendor omits usage numbers.
///
/// CJK text runs about 1.5 characters per token, other text about 4.
pub fn estimate_tokens(text: &str) -> u32 {
    let cjk = text
        .chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .count() as f64;
    let other = (text.chars().count() as f64) - cjk;
    (cjk / 1.5 + other / 4.0).ceil() as u32
}

/// Estimated cost in USD for one call, from a static per-model price table
/// (USD per 1K tokens). Unknown providers/models cost 0.
pub fn estimate_cost(
    provider: ProviderKind,
    model: &str,
    prompt_tokens: u32,
    completion_tokens: u32,
) -> f64 {
    let (input, output) = match (provider, model) {
        (ProviderKind::OpenAi, "gpt-3.5-turbo") => (0.0015, 0.002),
        (ProviderKind::OpenAi, "gpt-4") => (0.03, 0.06),
        (ProviderKind::OpenAi, "gpt-4o") => (0.005, 0.015),
        (ProviderKind::OpenAi, "gpt-4o-mini") => (0.000_15, 0.000_6),
        (ProviderKind::SiliconFlow, "Qwen/Qwen3-32B") => (0.000_1, 0.000_1),
        (ProviderKind::SiliconFlow, "Qwen/Qwen3-8B") => (0.000_05, 0.000_05),
        (ProviderKind::SiliconFlow, "deepseek-chat")
        | (ProviderKind::Deepseek, "deepseek-chat")
        | (ProviderKind::Deepseek, "deepseek-coder") => (0.000_14, 0.000_28),
        _ => return 0.0,
    };
    let cost = (prompt_tokens as f64 / 1000.0) * input + (completion_tokens as f64 / 1000.0) * output;
    (cost * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_mixed_text() {
        // 7 CJK chars -> ceil(7 / 1.5) = 5 tokens.
        assert_eq!(estimate_tokens("昨天买了日用品"), 5);
        // Pure ASCII: 8 chars -> 2 tokens.
        assert_eq!(estimate_tokens("hello ai"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimate_cost_known_and_unknown_models() {
        let cost = estimate_cost(ProviderKind::Deepseek, "deepseek-chat", 1000, 1000);
        assert!((cost - 0.000_42).abs() < 1e-9);
        assert_eq!(estimate_cost(ProviderKind::Custom, "anything", 1000, 1000), 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_sink_collects_records() {
        let sink = InMemoryCallLog::new();
        sink.record(CallRecord {
            id: "1".to_string(),
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            user_message: "hi".to_string(),
            assistant_message: Some("hello".to_string()),
            system_prompt: None,
            success: true,
            error: None,
            duration_ms: 5,
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
            cost: 0.0,
            created_at: Utc::now(),
        })
        .await;
        assert_eq!(sink.records().await.len(), 1);
    }
}
