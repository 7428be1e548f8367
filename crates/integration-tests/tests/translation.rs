mod harness;

use conduit_config::{RequestAction, ResponseAction, TranslatorConfig, TranslatorsConfig};
use conduit_core::RequestContext;
use conduit_llm::types::{GenerationOptions, Message, Role};
use conduit_llm::{CanonicalRequest, Gateway};
use harness::config::{ConfigBuilder, MODEL};
use harness::mock_backend::{MockBackend, MockOptions};

fn translator<A>(backends: &[&str], models: &[&str], action: A) -> TranslatorConfig<A> {
    TranslatorConfig {
        backends: backends.iter().map(|b| (*b).to_owned()).collect(),
        models: models.iter().map(|m| (*m).to_owned()).collect(),
        action,
    }
}

#[tokio::test]
async fn request_translators_rewrite_before_dispatch() {
    let free = MockBackend::new("free");
    let translators = TranslatorsConfig {
        request: vec![
            translator(&[], &["^gpt-"], RequestAction::FoldSystemPrompt),
            translator(&[], &[], RequestAction::DropSampling),
        ],
        ..TranslatorsConfig::default()
    };
    let config = ConfigBuilder::new().with_free("free").with_translators(translators).build();
    let gateway = Gateway::builder(config).backend(free.handle()).build().await.unwrap();

    let mut request = CanonicalRequest::chat(MODEL, vec![Message::system("be brief"), Message::user("hi")]);
    request.options = Some(GenerationOptions {
        temperature: Some(0.5),
        ..GenerationOptions::default()
    });
    gateway.complete(request, &RequestContext::new()).await.unwrap();

    let seen = &free.requests()[0];
    // first match wins: only the fold ran
    assert!(seen.messages.iter().all(|m| m.role != Role::System));
    assert_eq!(seen.messages[0].content.as_text(), "be brief\n\nhi");
    assert_eq!(seen.options.as_ref().and_then(|o| o.temperature), Some(0.5));
}

#[tokio::test]
async fn response_translators_match_on_serving_backend() {
    let options = || MockOptions {
        content: Some("<think>plan</think>The answer is 4".to_owned()),
        ..MockOptions::default()
    };
    let reasoning = MockBackend::build("reasoning", options());
    let plain = MockBackend::build("plain", options());
    let translators = TranslatorsConfig {
        response: vec![translator(
            &["reasoning"],
            &[],
            ResponseAction::StripReasoning {
                open: "<think>".to_owned(),
                close: "</think>".to_owned(),
            },
        )],
        ..TranslatorsConfig::default()
    };
    let config = ConfigBuilder::new()
        .with_free("reasoning")
        .with_paid("plain", 1.0)
        .with_translators(translators)
        .build();
    let gateway = Gateway::builder(config)
        .backend(reasoning.handle())
        .backend(plain.handle())
        .build()
        .await
        .unwrap();

    let request = || CanonicalRequest::chat(MODEL, vec![Message::user("2+2?")]);

    let stripped = gateway.complete(request(), &RequestContext::new()).await.unwrap();
    assert_eq!(stripped.content.as_deref(), Some("The answer is 4"));

    let raw = gateway
        .complete(request(), &RequestContext::new().with_preferred_backend("plain"))
        .await
        .unwrap();
    assert_eq!(raw.content.as_deref(), Some("<think>plan</think>The answer is 4"));
}

#[tokio::test]
async fn clamp_applies_only_to_matching_models() {
    let free = MockBackend::new("free");
    let translators = TranslatorsConfig {
        request: vec![translator(&[], &["^o1"], RequestAction::ClampMaxTokens { max: 256 })],
        ..TranslatorsConfig::default()
    };
    let config = ConfigBuilder::new().with_free("free").with_translators(translators).build();
    let gateway = Gateway::builder(config).backend(free.handle()).build().await.unwrap();

    let request = CanonicalRequest::chat(MODEL, vec![Message::user("hi")]);
    gateway.complete(request, &RequestContext::new()).await.unwrap();

    assert_eq!(free.requests()[0].options, None);
}
