//! Multi-provider configuration types
//!
//! The whole configuration is one serialized document, persisted under
//! [`MULTI_PROVIDER_CONFIG_KEY`], loaded into memory and replaced wholesale
//! on save. Field names are camelCase to stay compatible with the admin UI
//! document format.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// Store key of the singleton multi-provider configuration document
pub const MULTI_PROVIDER_CONFIG_KEY: &str = "llm_multi_provider_config";

/// Default health-check interval: 5 minutes
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Default per-request timeout for completions
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "siliconflow")]
    SiliconFlow,
    #[serde(rename = "deepseek")]
    Deepseek,
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Any OpenAI-compatible endpoint at a caller-supplied base URL
    #[serde(rename = "custom")]
    Custom,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "siliconflow" => Some(Self::SiliconFlow),
            "deepseek" => Some(Self::Deepseek),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "custom" | "openai_compat" | "openai-compat" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::SiliconFlow => write!(f, "siliconflow"),
            Self::Deepseek => write!(f, "deepseek"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One configured credential + model + endpoint combination.
///
/// Instances with equal `priority` form one selection tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInstance {
    pub id: String,
    pub provider: ProviderKind,
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Lower value = more preferred tier
    #[serde(default)]
    pub priority: i32,
    /// Relative share within a tier (load balancing only)
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_weight() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl ProviderInstance {
    pub fn new(provider: ProviderKind, name: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            name: name.into(),
            api_key: String::new(),
            model: model.into(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            priority: 0,
            weight: 1,
            enabled: true,
            healthy: true,
            last_health_check: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the instance options for its provider family.
    ///
    /// Runs at config-load/save time so that malformed instances are
    /// rejected up front instead of failing on every call.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(LlmError::configuration(format!(
                "instance '{}': model must not be empty",
                self.name
            )));
        }
        if self.weight < 1 {
            return Err(LlmError::configuration(format!(
                "instance '{}': weight must be >= 1",
                self.name
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::configuration(format!(
                "instance '{}': temperature must be within [0, 2]",
                self.name
            )));
        }
        match self.provider {
            ProviderKind::Custom => {
                if self.base_url.as_deref().unwrap_or("").is_empty() {
                    return Err(LlmError::configuration(format!(
                        "instance '{}': custom providers require a base URL",
                        self.name
                    )));
                }
            }
            _ => {
                if self.api_key.is_empty() {
                    return Err(LlmError::configuration(format!(
                        "instance '{}': API key must not be empty",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Per-call options handed to the adapter
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Closed per-call option set handed to a [`ChatProvider`](crate::ChatProvider)
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CallOptions {
    /// The effective base URL, without a trailing slash
    pub fn resolved_base_url(&self, default: &str) -> String {
        let base = self.base_url.as_deref().filter(|s| !s.is_empty()).unwrap_or(default);
        base.trim_end_matches('/').to_string()
    }
}

/// Failover policy across priority tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverPolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    1000
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

/// Selection strategy within one priority tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    RoundRobin,
    Weighted,
    Random,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::RoundRobin
    }
}

/// Load-balancing policy and health-check cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingPolicy {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

fn default_health_check_interval_ms() -> u64 {
    DEFAULT_HEALTH_CHECK_INTERVAL_MS
}

impl Default for LoadBalancingPolicy {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            health_check_interval_ms: default_health_check_interval_ms(),
        }
    }
}

/// The singleton multi-provider configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProviderConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub providers: Vec<ProviderInstance>,
    #[serde(default)]
    pub failover: FailoverPolicy,
    #[serde(default)]
    pub load_balancing: LoadBalancingPolicy,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl MultiProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            enabled: true,
            providers: Vec::new(),
            failover: FailoverPolicy::default(),
            load_balancing: LoadBalancingPolicy::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate every instance against its provider family
    pub fn validate(&self) -> Result<()> {
        for instance in &self.providers {
            instance.validate()?;
        }
        Ok(())
    }
}

/// Transient outcome of one health probe.
///
/// Folded back into the owning [`ProviderInstance`] after each cycle,
/// never separately persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub provider_id: String,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}
