//! Multi-provider service - failover execution and admin-facing config methods

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use tally_store::ConfigStore;

use crate::balancer::LoadBalancer;
use crate::config::{
    CallOptions, MultiProviderConfig, ProviderInstance, ProviderKind, MULTI_PROVIDER_CONFIG_KEY,
};
use crate::error::{LlmError, Result};
use crate::log::{estimate_cost, estimate_tokens, CallLogSink, CallRecord, NoopCallLog};
use crate::providers::{default_registry, ChatProvider};
use crate::types::{CompletionResponse, LlmRequestResult, Message, MessageRole};

/// Default timeout for a single health probe
pub(crate) const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Orchestrates generation requests across configured provider instances.
///
/// Construct one instance per process and inject it where needed; call
/// [`shutdown`](Self::shutdown) when done — the background health-check task
/// holds a reference to the service and keeps it alive until cancelled.
pub struct MultiProviderService {
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) config_key: String,
    pub(crate) registry: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    /// Runtime view of the configured instances; carries the failover
    /// health marks between probe cycles.
    pub(crate) instances: DashMap<String, ProviderInstance>,
    pub(crate) balancer: LoadBalancer,
    pub(crate) call_log: Arc<dyn CallLogSink>,
    pub(crate) health_task: StdMutex<Option<JoinHandle<()>>>,
    pub(crate) external_probing: bool,
    pub(crate) probe_timeout: Duration,
}

impl MultiProviderService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            config_key: MULTI_PROVIDER_CONFIG_KEY.to_string(),
            registry: default_registry(),
            instances: DashMap::new(),
            balancer: LoadBalancer::new(),
            call_log: Arc::new(NoopCallLog),
            health_task: StdMutex::new(None),
            external_probing: false,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Replace the whole adapter registry
    pub fn with_registry(
        mut self,
        registry: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    ) -> Self {
        self.registry = registry;
        self
    }

    /// Register (or replace) one adapter
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.registry.insert(provider.kind(), provider);
        self
    }

    pub fn with_call_log(mut self, sink: Arc<dyn CallLogSink>) -> Self {
        self.call_log = sink;
        self
    }

    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = key.into();
        self
    }

    /// Mark probing as owned by an external unified scheduler;
    /// [`start_health_checker`](Self::start_health_checker) becomes a no-op.
    pub fn with_external_probing(mut self, external: bool) -> Self {
        self.external_probing = external;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Read and parse the persisted document without touching the runtime map
    pub(crate) async fn fetch_config(&self) -> Result<Option<MultiProviderConfig>> {
        let raw = self
            .store
            .get(&self.config_key)
            .await
            .map_err(|e| LlmError::configuration(format!("config store error: {e}")))?;
        match raw {
            Some(text) => {
                let config: MultiProviderConfig = serde_json::from_str(&text).map_err(|e| {
                    LlmError::configuration(format!("malformed multi-provider config: {e}"))
                })?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// Load the configuration document, validate every instance against its
    /// provider family, and replace the runtime instance map wholesale.
    pub async fn load_config(&self) -> Result<Option<MultiProviderConfig>> {
        let config = self.fetch_config().await?;
        if let Some(ref config) = config {
            config.validate()?;
            self.refresh_instances(config);
        }
        Ok(config)
    }

    /// Validate and persist the configuration document, then replace the
    /// runtime instance map wholesale. Last writer wins.
    pub async fn save_config(&self, config: &MultiProviderConfig) -> Result<()> {
        config.validate()?;

        let mut stamped = config.clone();
        stamped.updated_at = Utc::now();

        let text = serde_json::to_string(&stamped)
            .map_err(|e| LlmError::configuration(format!("config serialization failed: {e}")))?;
        self.store
            .put(&self.config_key, &text)
            .await
            .map_err(|e| LlmError::configuration(format!("config store error: {e}")))?;

        self.refresh_instances(&stamped);
        tracing::info!(
            providers = stamped.providers.len(),
            enabled = stamped.enabled,
            "multi-provider config saved"
        );
        Ok(())
    }

    fn refresh_instances(&self, config: &MultiProviderConfig) {
        self.instances.clear();
        for instance in &config.providers {
            self.instances.insert(instance.id.clone(), instance.clone());
        }
    }

    /// Fold the document into the runtime map while keeping failover health
    /// marks; a probe cycle or an admin save rewrites them wholesale.
    fn sync_instances(&self, config: &MultiProviderConfig) {
        let ids: HashSet<&str> = config.providers.iter().map(|p| p.id.as_str()).collect();
        self.instances.retain(|id, _| ids.contains(id.as_str()));

        for instance in &config.providers {
            match self.instances.entry(instance.id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                    let marked_unhealthy = !entry.get().healthy;
                    let marked_at = entry.get().last_health_check;
                    let mut updated = instance.clone();
                    if marked_unhealthy {
                        updated.healthy = false;
                        updated.last_health_check = marked_at;
                    }
                    entry.insert(updated);
                }
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    entry.insert(instance.clone());
                }
            }
        }
    }

    /// Runtime snapshot of one instance (includes failover health marks)
    pub fn instance(&self, id: &str) -> Option<ProviderInstance> {
        self.instances.get(id).map(|i| i.clone())
    }

    pub(crate) fn mark_unhealthy(&self, id: &str) {
        if let Some(mut instance) = self.instances.get_mut(id) {
            instance.healthy = false;
            instance.last_health_check = Some(Utc::now());
        }
    }

    /// Enabled + healthy instances grouped into ascending priority tiers.
    ///
    /// Document order is kept within a tier so round-robin walks instances
    /// the way the admin arranged them.
    fn available_tiers(&self, config: &MultiProviderConfig) -> Vec<Vec<ProviderInstance>> {
        let mut active: Vec<ProviderInstance> = config
            .providers
            .iter()
            .filter(|p| p.enabled)
            .filter(|p| {
                self.instances
                    .get(&p.id)
                    .map(|i| i.healthy)
                    .unwrap_or(p.healthy)
            })
            .cloned()
            .collect();
        active.sort_by_key(|p| p.priority);

        let mut tiers: Vec<Vec<ProviderInstance>> = Vec::new();
        for instance in active {
            match tiers.last_mut() {
                Some(tier) if tier[0].priority == instance.priority => tier.push(instance),
                _ => tiers.push(vec![instance]),
            }
        }
        tiers
    }

    // ========================================================================
    // Failover execution
    // ========================================================================

    /// Route a chat completion across priority tiers.
    ///
    /// Walks tiers in ascending priority: one instance per tier is selected
    /// by the load balancer and invoked exactly once. The first success wins.
    /// A failed instance is marked unhealthy in memory; the walk continues
    /// only while failover is enabled. The outcome is always a structured
    /// [`LlmRequestResult`], never an error.
    pub async fn generate_chat(&self, messages: &[Message]) -> LlmRequestResult {
        let started = Instant::now();

        let config = match self.fetch_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                return LlmRequestResult::failure(
                    "multi-provider configuration not found",
                    elapsed_ms(started),
                )
            }
            Err(e) => return LlmRequestResult::failure(e.to_string(), elapsed_ms(started)),
        };

        if !config.enabled {
            return LlmRequestResult::failure(
                "multi-provider mode is disabled",
                elapsed_ms(started),
            );
        }

        self.sync_instances(&config);

        let tiers = self.available_tiers(&config);
        if tiers.is_empty() {
            return LlmRequestResult::failure("no providers available", elapsed_ms(started));
        }

        for tier in &tiers {
            let Some(selected) = self.balancer.select(tier, config.load_balancing.strategy)
            else {
                continue;
            };
            let Some(adapter) = self.registry.get(&selected.provider) else {
                tracing::warn!(provider = %selected.provider, "no adapter registered, skipping tier member");
                continue;
            };

            let opts = selected.call_options();
            let attempt = Instant::now();
            match adapter.complete(&opts, messages).await {
                Ok(response) => {
                    self.log_call(selected, messages, Ok(&response), elapsed_ms(attempt))
                        .await;
                    tracing::debug!(
                        provider = %selected.name,
                        priority = selected.priority,
                        "completion served"
                    );
                    return LlmRequestResult::success(
                        response,
                        selected.id.as_str(),
                        elapsed_ms(started),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %selected.name,
                        priority = selected.priority,
                        error = %e,
                        "provider call failed"
                    );
                    self.mark_unhealthy(&selected.id);
                    self.log_call(selected, messages, Err(&e), elapsed_ms(attempt)).await;

                    if config.failover.enabled {
                        continue;
                    }
                    return LlmRequestResult::failure_from(
                        selected.id.as_str(),
                        e.to_string(),
                        elapsed_ms(started),
                    );
                }
            }
        }

        LlmRequestResult::failure("no providers available", elapsed_ms(started))
    }

    /// Route a single-prompt completion
    pub async fn generate_text(&self, prompt: &str) -> LlmRequestResult {
        self.generate_chat(&[Message::user(prompt)]).await
    }

    // ========================================================================
    // Admin conveniences
    // ========================================================================

    /// Fire one tiny completion against explicit settings, without touching
    /// the persisted configuration. Used by the admin UI's "test" button.
    pub async fn test_connection(
        &self,
        kind: ProviderKind,
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
    ) -> ConnectionTestResult {
        let Some(adapter) = self.registry.get(&kind) else {
            return ConnectionTestResult {
                success: false,
                message: format!("unknown provider: {kind}"),
            };
        };

        let opts = CallOptions {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.map(|s| s.to_string()),
            temperature: 0.7,
            max_tokens: 100,
            timeout: Duration::from_secs(15),
        };
        let probe = [Message::user(
            "Hello, this is a connection test. Please respond with 'OK'.",
        )];

        match adapter.complete(&opts, &probe).await {
            Ok(response) => {
                let snippet: String = response.content.chars().take(50).collect();
                ConnectionTestResult {
                    success: true,
                    message: snippet,
                }
            }
            Err(e) => ConnectionTestResult {
                success: false,
                message: e.to_string(),
            },
        }
    }

    async fn log_call(
        &self,
        instance: &ProviderInstance,
        messages: &[Message],
        outcome: std::result::Result<&CompletionResponse, &LlmError>,
        duration_ms: u64,
    ) {
        let system_prompt = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());
        let user_message = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let (assistant_message, usage, error) = match outcome {
            Ok(response) => (Some(response.content.clone()), response.usage, None),
            Err(e) => (None, None, Some(e.to_string())),
        };

        let (prompt_tokens, completion_tokens) = match usage {
            Some(u) => (u.prompt_tokens, u.completion_tokens),
            None => (
                estimate_tokens(&user_message) + estimate_tokens(system_prompt.as_deref().unwrap_or("")),
                estimate_tokens(assistant_message.as_deref().unwrap_or("")),
            ),
        };

        self.call_log
            .record(CallRecord {
                id: uuid::Uuid::new_v4().to_string(),
                provider: instance.provider.to_string(),
                model: instance.model.clone(),
                user_message,
                assistant_message,
                system_prompt,
                success: error.is_none(),
                error,
                duration_ms,
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                cost: estimate_cost(
                    instance.provider,
                    &instance.model,
                    prompt_tokens,
                    completion_tokens,
                ),
                created_at: Utc::now(),
            })
            .await;
    }
}

pub(crate) fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Outcome of an explicit connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}
