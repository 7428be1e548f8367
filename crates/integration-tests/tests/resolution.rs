mod harness;

use std::sync::Arc;
use std::time::Duration;

use conduit_config::{Config, TenantConfig};
use conduit_core::{EndpointKind, RequestContext};
use conduit_llm::types::Message;
use conduit_llm::{CanonicalRequest, Gateway};
use conduit_routing::{RequiredCapabilities, ResolutionQuery, Resolver, Tier};
use conduit_state::storage::memory::{MemoryHealthStore, MemoryQuotaStore};
use conduit_state::{HealthStore, QuotaStore};
use harness::config::{ConfigBuilder, MODEL};
use harness::mock_backend::MockBackend;

const CATALOG: &str = r#"
    [providers.free]
    free = true
    quota = 100

    [[providers.free.models]]
    id = "gpt-x"

    [providers.cheap]

    [[providers.cheap.models]]
    id = "gpt-x"
    cost_per_unit = 0.5

    [providers.pricey]

    [[providers.pricey.models]]
    id = "gpt-x"
    cost_per_unit = 3.0
"#;

struct Fixture {
    resolver: Resolver,
    health: Arc<MemoryHealthStore>,
}

fn fixture() -> Fixture {
    let config = Config::parse(CATALOG).unwrap();
    let health = Arc::new(MemoryHealthStore::new());
    let quota = Arc::new(MemoryQuotaStore::new(
        [("free".to_owned(), 100)].into(),
        config.quota.window,
    ));
    let resolver = Resolver::from_config(&config, health.clone(), quota);
    Fixture { resolver, health }
}

fn backends(result: &conduit_routing::ResolutionResult) -> Vec<&str> {
    result.candidates.iter().map(|c| c.backend.as_str()).collect()
}

#[tokio::test]
async fn free_healthy_backend_is_sole_candidate() {
    let fixture = fixture();
    let query = ResolutionQuery::new(MODEL, EndpointKind::ChatCompletions, RequiredCapabilities::NONE);

    let result = fixture.resolver.resolve(&query).await.unwrap();

    assert_eq!(result.tier, Tier::Free);
    assert_eq!(backends(&result), ["free"]);
    assert_eq!(result.winner.backend, "free");
}

#[tokio::test]
async fn unhealthy_free_yields_paid_by_ascending_cost() {
    let fixture = fixture();
    fixture
        .health
        .mark_unhealthy("free", "timeout", Duration::from_secs(60))
        .await;
    let query = ResolutionQuery::new(MODEL, EndpointKind::ChatCompletions, RequiredCapabilities::NONE);

    let result = fixture.resolver.resolve(&query).await.unwrap();

    assert_eq!(result.tier, Tier::Paid);
    assert_eq!(backends(&result), ["cheap", "pricey"]);
}

#[tokio::test]
async fn gateway_never_picks_paid_over_available_free() {
    let free = MockBackend::new("free");
    let paid = MockBackend::new("paid");
    let config = ConfigBuilder::new()
        .with_paid("paid", 0.0)
        .with_free("free")
        .with_quota("free", 1000)
        .build();
    let gateway = Gateway::builder(config)
        .backend(free.handle())
        .backend(paid.handle())
        .build()
        .await
        .unwrap();

    for _ in 0..5 {
        let request = CanonicalRequest::chat(MODEL, vec![Message::user("hi")]);
        let response = gateway.complete(request, &RequestContext::new()).await.unwrap();
        assert_eq!(response.backend.as_deref(), Some("free"));
    }
    assert_eq!(paid.calls(), 0);
}

#[tokio::test]
async fn emergency_tier_serves_when_every_quota_is_spent() {
    let free = MockBackend::new("free");
    let config = ConfigBuilder::new().with_free("free").with_quota("free", 1).build();
    let gateway = Gateway::builder(config).backend(free.handle()).build().await.unwrap();

    gateway.quota().increment_usage("free", 1).await;
    assert!(!gateway.quota().has_remaining_quota("free").await);

    let query = ResolutionQuery::new(MODEL, EndpointKind::ChatCompletions, RequiredCapabilities::NONE);
    let result = gateway.resolver().resolve(&query).await.unwrap();
    assert_eq!(result.tier, Tier::Emergency);

    let request = CanonicalRequest::chat(MODEL, vec![Message::user("hi")]);
    let response = gateway.complete(request, &RequestContext::new()).await.unwrap();
    assert_eq!(response.backend.as_deref(), Some("free"));
}

#[tokio::test]
async fn tenant_preference_and_denial_apply_through_the_gateway() {
    let free = MockBackend::new("free");
    let paid = MockBackend::new("paid");
    let config = ConfigBuilder::new()
        .with_free("free")
        .with_paid("paid", 1.0)
        .with_tenant(
            "acme",
            TenantConfig {
                preferred_backend: Some("paid".to_owned()),
                deny_backends: Vec::new(),
            },
        )
        .with_tenant(
            "frugal",
            TenantConfig {
                preferred_backend: None,
                deny_backends: vec!["free".to_owned()],
            },
        )
        .build();
    let gateway = Gateway::builder(config)
        .backend(free.handle())
        .backend(paid.handle())
        .build()
        .await
        .unwrap();

    let request = || CanonicalRequest::chat(MODEL, vec![Message::user("hi")]);

    let acme = gateway
        .complete(request(), &RequestContext::new().with_tenant("acme"))
        .await
        .unwrap();
    assert_eq!(acme.backend.as_deref(), Some("paid"));

    let frugal = gateway
        .complete(request(), &RequestContext::new().with_tenant("frugal"))
        .await
        .unwrap();
    assert_eq!(frugal.backend.as_deref(), Some("paid"));

    let anonymous = gateway.complete(request(), &RequestContext::new()).await.unwrap();
    assert_eq!(anonymous.backend.as_deref(), Some("free"));
}

#[tokio::test]
async fn qualified_model_id_targets_a_backend() {
    let free = MockBackend::new("free");
    let paid = MockBackend::new("paid");
    let config = ConfigBuilder::new().with_free("free").with_paid("paid", 1.0).build();
    let gateway = Gateway::builder(config)
        .backend(free.handle())
        .backend(paid.handle())
        .build()
        .await
        .unwrap();

    let request = CanonicalRequest::chat("paid/gpt-x", vec![Message::user("hi")]);
    let response = gateway.complete(request, &RequestContext::new()).await.unwrap();

    assert_eq!(response.backend.as_deref(), Some("paid"));
    assert_eq!(paid.requests()[0].model, MODEL);
}
