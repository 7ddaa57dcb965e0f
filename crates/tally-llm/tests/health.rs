//! Health probing against an HTTP-level mock vendor

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tally_llm::{MultiProviderConfig, MultiProviderService, ProviderInstance, ProviderKind};
use tally_store::MemoryConfigStore;

fn custom_instance(id: &str, base_url: &str) -> ProviderInstance {
    let mut inst = ProviderInstance::new(ProviderKind::Custom, id, "default");
    inst.id = id.to_string();
    inst.base_url = Some(base_url.to_string());
    inst
}

async fn service_with_instance(
    instance: ProviderInstance,
) -> (Arc<MultiProviderService>, MultiProviderConfig) {
    let mut config = MultiProviderConfig::new("health-test");
    config.providers = vec![instance];
    let service = Arc::new(
        MultiProviderService::new(Arc::new(MemoryConfigStore::new()))
            .with_probe_timeout(Duration::from_millis(500)),
    );
    service.save_config(&config).await.unwrap();
    (service, config)
}

#[tokio::test]
async fn test_probe_hits_models_endpoint_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer sk-probe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut instance = custom_instance("p1", &server.uri());
    instance.api_key = "sk-probe".to_string();
    let (service, _) = service_with_instance(instance.clone()).await;

    let status = service.check_provider_health(&instance).await;
    assert!(status.healthy);
    assert!(status.error.is_none());
    assert!(status.response_time_ms.is_some());
}

#[tokio::test]
async fn test_unauthorized_probe_marks_unhealthy_then_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (service, _) = service_with_instance(custom_instance("p1", &server.uri())).await;

    service.trigger_health_check().await.unwrap();
    let statuses = service.get_providers_health_status().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].healthy);

    // Credential fixed: the next cycle flips the flag back.
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    service.trigger_health_check().await.unwrap();
    let statuses = service.get_providers_health_status().await.unwrap();
    assert!(statuses[0].healthy);
}

#[tokio::test]
async fn test_probe_failure_reasons_are_classified() {
    let server = MockServer::start().await;
    let instance = custom_instance("p1", &server.uri());
    let (service, _) = service_with_instance(instance.clone()).await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let status = service.check_provider_health(&instance).await;
    assert_eq!(status.error.as_deref(), Some("invalid credential"));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let status = service.check_provider_health(&instance).await;
    assert_eq!(status.error.as_deref(), Some("model or endpoint not found"));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let status = service.check_provider_health(&instance).await;
    assert_eq!(status.error.as_deref(), Some("rate limited"));
}

#[tokio::test]
async fn test_slow_probe_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let instance = custom_instance("p1", &server.uri());
    let (service, _) = service_with_instance(instance.clone()).await;

    let status = service.check_provider_health(&instance).await;
    assert!(!status.healthy);
    assert_eq!(status.error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_anthropic_probe_uses_minimal_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(body_partial_json(json!({"max_tokens": 1, "temperature": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "ok"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut instance = ProviderInstance::new(ProviderKind::Anthropic, "claude", "claude-3-5-haiku");
    instance.id = "ant-1".to_string();
    instance.api_key = "sk-ant".to_string();
    instance.base_url = Some(server.uri());
    let (service, _) = service_with_instance(instance.clone()).await;

    let status = service.check_provider_health(&instance).await;
    assert!(status.healthy, "probe failed: {:?}", status.error);
}

#[tokio::test]
async fn test_disabled_instances_are_not_probed() {
    let server = MockServer::start().await;
    // Zero expected requests: a disabled instance must never be probed.
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut instance = custom_instance("p1", &server.uri());
    instance.enabled = false;
    let (service, _) = service_with_instance(instance).await;

    service.trigger_health_check().await.unwrap();
}
