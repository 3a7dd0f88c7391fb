use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use paywall_resolver::infrastructure::mocks::{MockFetcher, MockRuleEvaluator, RecordingTracker};
use paywall_resolver::{
    CacheEntry, CacheLookup, EventData, FixedLocale, Metrics, PaywallResolver, PaywallResponse,
    PresentationRequest, RequestSignature, ResponseIdentifiers, ResponseRegistry, ShardedStorage,
    TriggerOutcome,
};
use std::sync::Arc;

/// Benchmark signature computation speed
fn bench_signature_computation(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature_computation");
    let event = EventData::new("app_open").with_parameter("source", "push");

    group.bench_function("from_identifier", |b| {
        b.iter(|| RequestSignature::new(black_box(Some("annual_offer")), None, black_box("en_US")))
    });

    group.bench_function("from_event", |b| {
        b.iter(|| RequestSignature::new(None, black_box(Some(&event)), black_box("en_US")))
    });

    group.finish();
}

/// Benchmark registry lookups against cached and pending signatures
fn bench_registry_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");
    group.throughput(Throughput::Elements(1));

    for signatures in [1usize, 100, 10_000] {
        let registry: ResponseRegistry<Arc<ShardedStorage<RequestSignature, CacheEntry>>> =
            ResponseRegistry::new(Arc::new(ShardedStorage::new()), Metrics::new());
        let keys: Vec<_> = (0..signatures)
            .map(|i| RequestSignature::new(Some(format!("pw_{i}").as_str()), None, "en_US"))
            .collect();
        for key in &keys {
            let lookup = registry.lookup(key, None, false, Box::new(|_| {}));
            if let CacheLookup::Claimed(ticket) = lookup {
                if let Some(fan_out) = registry.complete(ticket, Ok(PaywallResponse::new("pw"))) {
                    fan_out.deliver();
                }
            }
        }
        let identifiers = ResponseIdentifiers::assigned("pw", "exp", "var");

        group.bench_with_input(
            BenchmarkId::new("cached_hit", signatures),
            &signatures,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    i = (i + 1) % keys.len();
                    registry.lookup(
                        black_box(&keys[i]),
                        Some(&identifiers),
                        false,
                        Box::new(|result| {
                            black_box(result.ok());
                        }),
                    )
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the full async path for a cached response
fn bench_resolve_cached(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let resolver = PaywallResolver::builder()
        .with_fetcher(Arc::new(MockFetcher::responding(PaywallResponse::new("pw"))))
        .with_rule_evaluator(Arc::new(MockRuleEvaluator::new(TriggerOutcome::ShowPaywall {
            paywall_id: "pw".into(),
            experiment_id: "exp".into(),
            variant_id: "var".into(),
        })))
        .with_tracker(Arc::new(RecordingTracker::new()))
        .with_locale_provider(Arc::new(FixedLocale::new("en_US")))
        .with_config_ready(true)
        .build()
        .unwrap();
    let request = PresentationRequest::FromIdentifier("pw".into());
    runtime
        .block_on(resolver.resolve_and_fetch(request.clone()))
        .unwrap();

    c.bench_function("resolve_cached", |b| {
        b.to_async(&runtime)
            .iter(|| resolver.resolve_and_fetch(black_box(request.clone())))
    });
}

criterion_group!(
    benches,
    bench_signature_computation,
    bench_registry_lookup,
    bench_resolve_cached
);
criterion_main!(benches);
