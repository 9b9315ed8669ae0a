//! Resilience Benchmarks
//!
//! Benchmarks for the breaker gate, backoff calculation, cache access and
//! payload mapping on the hot path of every inventory call.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use waybill::waybill_cache::{CacheStore, InMemoryCache, TaggedCache};
use waybill::waybill_http_client::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
use waybill::waybill_inventory::{ProductQuery, keys, mapping};

// =============================================================================
// Circuit Breaker Benchmarks
// =============================================================================

fn bench_circuit_breaker(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker");

    let cb = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));

    group.bench_function("is_open_closed", |b| {
        let cb = cb.clone();
        b.iter(|| black_box(cb.is_open()))
    });

    group.bench_function("stats", |b| {
        let cb = cb.clone();
        b.iter(|| black_box(cb.stats()))
    });

    group.bench_function("record_success", |b| {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        b.iter(|| cb.record_success())
    });

    group.bench_function("record_failure", |b| {
        b.iter_batched(
            || CircuitBreaker::new(CircuitBreakerConfig::new(1000, Duration::from_secs(30))),
            |cb| cb.record_failure(),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// =============================================================================
// Retry Benchmarks
// =============================================================================

fn bench_retry_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_policy");

    let policy = RetryPolicy::exponential(10, Duration::from_millis(100));
    for attempt in [1, 3, 5, 10] {
        group.bench_with_input(
            BenchmarkId::new("delay_after_attempt", attempt),
            &attempt,
            |b, &attempt| b.iter(|| black_box(policy.delay_after_attempt(attempt))),
        );
    }

    group.finish();
}

// =============================================================================
// Cache Benchmarks
// =============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    let cache = Arc::new(InMemoryCache::new());
    rt.block_on(cache.set_json(
        "inventory:product:sku-1",
        r#"{"id":"sku-1"}"#.to_string(),
        Duration::from_secs(300),
    ))
    .expect("seed cache");

    let cache = &cache;
    group.bench_function("get_hit", |b| {
        b.to_async(&rt)
            .iter(|| async move { black_box(cache.get_json("inventory:product:sku-1").await) })
    });

    group.bench_function("get_miss", |b| {
        b.to_async(&rt)
            .iter(|| async move { black_box(cache.get_json("inventory:product:absent").await) })
    });

    let tagged = TaggedCache::new(Arc::new(InMemoryCache::new()));
    let tagged = &tagged;
    group.bench_function("set_with_tags", |b| {
        b.to_async(&rt).iter(|| async move {
            tagged
                .set_with_tags(
                    "inventory:products:list",
                    "[]".to_string(),
                    &["product-lists"],
                    Duration::from_secs(30),
                )
                .await
        })
    });

    group.finish();
}

// =============================================================================
// Mapping Benchmarks
// =============================================================================

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");

    let product = json!({
        "data": {
            "productId": "sku-1",
            "sku": "PAL-100",
            "name": "Pallet",
            "quantityAvailable": 40,
            "quantityReserved": "2",
            "price": 12.5
        }
    });
    group.bench_function("map_product_enveloped", |b| {
        b.iter(|| black_box(mapping::map_product(&product, None)))
    });

    let list = json!({
        "items": (0..50)
            .map(|i| json!({"id": format!("sku-{i}"), "name": "Pallet", "available": i}))
            .collect::<Vec<_>>()
    });
    group.bench_function("map_products_50", |b| {
        b.iter(|| black_box(mapping::map_products(&list)))
    });

    let query = ProductQuery {
        search: Some("pallet".into()),
        category: Some("packaging".into()),
        page: Some(2),
        ..Default::default()
    };
    group.bench_function("product_list_key", |b| {
        b.iter(|| black_box(keys::product_list(&query)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_circuit_breaker,
    bench_retry_policy,
    bench_cache,
    bench_mapping,
);
criterion_main!(benches);
