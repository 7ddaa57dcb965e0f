//! Background health checking
//!
//! A periodic prober keeps each instance's `healthy` flag current,
//! independently of request traffic. Requests may observe slightly stale
//! flags; routing and probing are eventually consistent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;

use crate::config::{HealthStatus, ProviderInstance, DEFAULT_HEALTH_CHECK_INTERVAL_MS};
use crate::error::Result;
use crate::service::{elapsed_ms, MultiProviderService};

impl MultiProviderService {
    /// Probe one instance and classify the outcome.
    ///
    /// The probe is bounded twice: the adapter request carries the probe
    /// timeout, and the whole call is wrapped in one as well so a stuck
    /// resolver cannot hold a cycle open.
    pub async fn check_provider_health(&self, instance: &ProviderInstance) -> HealthStatus {
        let started = Instant::now();
        let checked_at = Utc::now();

        let Some(adapter) = self.registry.get(&instance.provider) else {
            return HealthStatus {
                provider_id: instance.id.clone(),
                healthy: false,
                response_time_ms: Some(0),
                error: Some(format!("no adapter registered for {}", instance.provider)),
                checked_at,
            };
        };

        let mut opts = instance.call_options();
        opts.timeout = self.probe_timeout;

        let outcome = tokio::time::timeout(self.probe_timeout, adapter.probe(&opts)).await;
        let response_time_ms = elapsed_ms(started);

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.probe_reason()),
            Err(_) => Some("timeout".to_string()),
        };

        HealthStatus {
            provider_id: instance.id.clone(),
            healthy: error.is_none(),
            response_time_ms: Some(response_time_ms),
            error,
            checked_at,
        }
    }

    /// Probe every enabled instance concurrently, fold the statuses back
    /// into the configuration document, and re-save it atomically.
    pub async fn run_health_cycle(&self) -> Result<()> {
        let Some(mut config) = self.fetch_config().await? else {
            return Ok(());
        };
        if !config.enabled {
            return Ok(());
        }

        tracing::debug!(providers = config.providers.len(), "running provider health cycle");

        let probes = config
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|instance| async move {
                (instance.id.clone(), self.check_provider_health(instance).await)
            });
        let statuses: HashMap<String, HealthStatus> = join_all(probes).await.into_iter().collect();

        for instance in &mut config.providers {
            let Some(status) = statuses.get(&instance.id) else {
                continue;
            };
            instance.healthy = status.healthy;
            instance.last_health_check = Some(status.checked_at);
            match &status.error {
                None => tracing::debug!(provider = %instance.name, "provider healthy"),
                Some(reason) => {
                    tracing::warn!(provider = %instance.name, reason = %reason, "provider unhealthy")
                }
            }
        }

        self.save_config(&config).await
    }

    /// Run one probe cycle now (admin-facing)
    pub async fn trigger_health_check(&self) -> Result<()> {
        self.run_health_cycle().await
    }

    /// Health flags of every configured instance, from the persisted document
    pub async fn get_providers_health_status(&self) -> Result<Vec<HealthStatus>> {
        let Some(config) = self.fetch_config().await? else {
            return Ok(Vec::new());
        };
        Ok(config
            .providers
            .iter()
            .map(|p| HealthStatus {
                provider_id: p.id.clone(),
                healthy: p.healthy,
                response_time_ms: None,
                error: None,
                checked_at: p.last_health_check.unwrap_or(p.created_at),
            })
            .collect())
    }

    /// Start the periodic prober.
    ///
    /// The interval comes from `loadBalancing.healthCheckIntervalMs` (default
    /// 5 minutes); the first cycle runs immediately. No-op when probing is
    /// owned by an external scheduler or a prober is already running.
    pub async fn start_health_checker(self: &Arc<Self>) {
        if self.external_probing {
            tracing::info!("health probing is externally scheduled; not starting the prober");
            return;
        }

        let interval_ms = match self.fetch_config().await {
            Ok(Some(config)) => config.load_balancing.health_check_interval_ms,
            _ => DEFAULT_HEALTH_CHECK_INTERVAL_MS,
        };

        let Ok(mut guard) = self.health_task.lock() else {
            return;
        };
        if guard.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }

        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(interval_ms.max(1000)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = service.run_health_cycle().await {
                    tracing::warn!(error = %e, "health cycle failed");
                }
            }
        });
        *guard = Some(handle);
        tracing::info!(interval_ms, "health checker started");
    }

    /// Cancel the background prober. Required for the service to be dropped:
    /// the prober task holds a reference to it.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.health_task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                tracing::info!("health checker stopped");
            }
        }
    }
}
