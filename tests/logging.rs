use paywall_resolver::infrastructure::mocks::{
    MockCaptureLayer, MockCatalog, MockFetcher, MockRuleEvaluator,
};
use paywall_resolver::{
    EventData, FetchError, FixedLocale, PaywallResolver, PaywallResponse, PresentationRequest,
    Product, ProductType, TriggerOutcome,
};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

const TRACKING_TARGET: &str = "paywall_resolver::tracking";

#[tokio::test]
async fn test_default_tracker_logs_tracked_events() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let resolver = PaywallResolver::builder()
        .with_fetcher(Arc::new(MockFetcher::responding(PaywallResponse::new("pw_1"))))
        .with_rule_evaluator(Arc::new(MockRuleEvaluator::new(TriggerOutcome::ShowPaywall {
            paywall_id: "pw_1".into(),
            experiment_id: "exp_1".into(),
            variant_id: "var_1".into(),
        })))
        .with_locale_provider(Arc::new(FixedLocale::new("en_US")))
        .with_config_ready(true)
        .build()
        .unwrap();

    resolver
        .resolve_and_fetch(PresentationRequest::ExplicitTrigger(EventData::new("app_open")))
        .await
        .unwrap();

    let tracked = capture.events_for(TRACKING_TARGET);
    let names: Vec<_> = tracked.iter().filter_map(|e| e.field("event")).collect();
    assert_eq!(
        names,
        vec![
            "trigger_fire",
            "paywall_response_load_start",
            "paywall_response_load_complete",
        ]
    );
    assert!(tracked.iter().all(|e| e.level == Level::INFO));
    assert_eq!(tracked[0].field("experiment_id"), Some("exp_1"));
    assert_eq!(tracked[1].field("trigger"), Some("app_open"));
}

#[tokio::test]
async fn test_catalog_failure_is_logged_as_warning() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = PaywallResponse::new("pw_1")
        .with_products(vec![Product::new("annual", ProductType::Primary)]);
    let resolver = PaywallResolver::builder()
        .with_fetcher(Arc::new(MockFetcher::responding(response)))
        .with_rule_evaluator(Arc::new(MockRuleEvaluator::new(TriggerOutcome::NoRuleMatch)))
        .with_catalog(Arc::new(MockCatalog::failing(FetchError::Network("offline".into()))))
        .with_locale_provider(Arc::new(FixedLocale::new("en_US")))
        .build()
        .unwrap();

    let delivered = resolver
        .resolve_and_fetch(PresentationRequest::FromIdentifier("pw_1".into()))
        .await
        .unwrap();
    assert!(delivered.product_variables.is_empty());

    let warnings: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.level == Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "failed to load store products");
    assert_eq!(warnings[0].field("paywall"), Some("pw_1"));
}

#[tokio::test]
async fn test_not_found_is_logged_and_tracked() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let resolver = PaywallResolver::builder()
        .with_fetcher(Arc::new(MockFetcher::failing(FetchError::NotFound)))
        .with_rule_evaluator(Arc::new(MockRuleEvaluator::new(TriggerOutcome::NoRuleMatch)))
        .with_locale_provider(Arc::new(FixedLocale::new("en_US")))
        .build()
        .unwrap();

    let _ = resolver
        .resolve_and_fetch(PresentationRequest::FromIdentifier("gone".into()))
        .await;

    let states: Vec<_> = capture
        .events_for(TRACKING_TARGET)
        .iter()
        .filter_map(|e| e.field("state").map(str::to_string))
        .collect();
    assert_eq!(states, vec!["start", "not_found"]);
    assert!(capture
        .events()
        .iter()
        .any(|e| e.level == Level::WARN && e.message == "paywall response load failed"));
}
