//! End-to-end behavior of the inventory client against a mock upstream.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use waybill_auth::{ClientCredentials, CredentialSource, TokenManager};
use waybill_cache::{CacheError, CacheResult, CacheStore};
use waybill_core::{HealthStatus, ManualClock};
use waybill_http_client::{CircuitBreakerConfig, CircuitState, HttpClient, HttpClientConfig};
use waybill_inventory::*;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http(server: &MockServer) -> HttpClient {
    HttpClient::new(
        HttpClientConfig::builder()
            .base_url(format!("{}/api", server.uri()))
            .build(),
    )
    .unwrap()
}

fn client_with(server: &MockServer, clock: Arc<ManualClock>, config: InventoryConfig) -> InventoryClient {
    let http = http(server);
    let tokens = TokenManager::new(CredentialSource::static_token("test-token"), http.clone());
    InventoryClient::builder(http, tokens)
        .config(config)
        .clock(clock)
        .build()
}

fn client(server: &MockServer) -> (InventoryClient, Arc<ManualClock>) {
    let clock = ManualClock::shared();
    (client_with(server, clock.clone(), InventoryConfig::default()), clock)
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

fn product_json(id: &str, available: u64) -> serde_json::Value {
    json!({
        "id": id,
        "sku": "PAL-EU",
        "name": "Euro pallet",
        "availableQuantity": available,
        "reserved": 2,
        "unitPrice": "12.5",
    })
}

fn reservation_json(id: &str, quantity: u64, status: &str) -> serde_json::Value {
    json!({"id": id, "productId": "p-1", "qty": quantity, "status": status})
}

#[tokio::test]
async fn test_open_breaker_returns_fallback_without_calling_upstream() {
    let server = MockServer::start().await;
    let (client, _) = client(&server);
    for _ in 0..5 {
        client.breaker().record_failure();
    }

    let product = client.get_product("p-1").await;
    let reservations = client.list_reservations(&ReservationQuery::default()).await;

    assert!(product.is_fallback());
    assert_eq!(product.value(), Some(&Product::placeholder("p-1")));
    assert!(reservations.is_fallback());
    assert_eq!(reservations.value(), Some(&Vec::new()));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_cold_cache_fetches_once_then_serves_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 17)))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let first = client.get_product("p-1").await;
    let second = client.get_product("p-1").await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(first.value(), second.value());
    let product = second.into_value().unwrap();
    assert_eq!(product.available_quantity, 17);
    assert_eq!(product.reserved_quantity, 2);
    assert_eq!(product.unit_price, 12.5);
}

#[tokio::test]
async fn test_cached_product_expires_after_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 17)))
        .expect(2)
        .mount(&server)
        .await;
    let (client, clock) = client(&server);

    client.get_product("p-1").await;
    clock.advance(Duration::from_secs(299));
    client.get_product("p-1").await;
    clock.advance(Duration::from_secs(1));
    client.get_product("p-1").await;
}

#[tokio::test]
async fn test_transient_failures_retry_then_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let (client, clock) = client(&server);

    let product = client.get_product("p-1").await;

    assert!(product.is_fallback());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(client.breaker().stats().failure_count, 1);
}

#[tokio::test]
async fn test_upstream_timeouts_retry_then_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_json("p-1", 10))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let http = HttpClient::new(
        HttpClientConfig::builder()
            .base_url(format!("{}/api", server.uri()))
            .timeout(Duration::from_millis(50))
            .build(),
    )
    .unwrap();
    let tokens = TokenManager::new(CredentialSource::static_token("test-token"), http.clone());
    let clock = ManualClock::shared();
    let client = InventoryClient::builder(http, tokens).clock(clock.clone()).build();

    let product = client.get_product("p-1").await;

    assert!(product.is_fallback());
    assert_eq!(product.value(), Some(&Product::placeholder("p-1")));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(client.breaker().stats().failure_count, 1);
}

#[tokio::test]
async fn test_recovers_within_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 4)))
        .mount(&server)
        .await;
    let (client, clock) = client(&server);

    let product = client.get_product("p-1").await;

    assert!(product.is_success());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    assert_eq!(client.breaker().stats().failure_count, 0);
}

#[tokio::test]
async fn test_not_found_is_not_retried_and_not_held_against_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let clock = ManualClock::shared();
    let config = InventoryConfig::default()
        .with_breaker(CircuitBreakerConfig::new(1, Duration::from_secs(30)));
    let client = client_with(&server, clock.clone(), config);

    let reservation = client.get_reservation("missing").await;

    assert!(reservation.is_fallback());
    assert_eq!(reservation.value().unwrap().status, ReservationStatus::Unknown);
    assert!(clock.sleeps().is_empty());
    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_fallbacks_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 9)))
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    assert!(client.get_product("p-1").await.is_fallback());
    let product = client.get_product("p-1").await;

    assert!(product.is_success());
    assert_eq!(product.into_value().unwrap().available_quantity, 9);
}

#[tokio::test]
async fn test_unmappable_read_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("maintenance")))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    assert!(client.get_product("p-1").await.is_fallback());
    assert_eq!(client.breaker().stats().failure_count, 1);
}

#[tokio::test]
async fn test_list_products_passes_filters_and_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("category", "pallets"))
        .and(query_param("search", "euro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [product_json("p-1", 3), product_json("p-2", 0)],
            "total": 2,
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);
    let query = ProductQuery {
        search: Some("euro".into()),
        category: Some("pallets".into()),
        ..Default::default()
    };

    let first = client.list_products(&query).await.into_value().unwrap();
    let second = client.list_products(&query).await.into_value().unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_update_invalidates_cached_reservation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reservations/r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reservation_json("r-1", 2, "pending")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reservations/r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reservation_json("r-1", 5, "confirmed")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/reservations/r-1"))
        .and(body_json(json!({"quantity": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": reservation_json("r-1", 5, "confirmed")
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    assert_eq!(client.get_reservation("r-1").await.into_value().unwrap().quantity, 2);
    assert_eq!(client.get_reservation("r-1").await.into_value().unwrap().quantity, 2);

    let update = ReservationUpdate {
        quantity: Some(5),
        ..Default::default()
    };
    let updated = client.update_reservation("r-1", &update).await;
    assert!(updated.is_success());

    let fresh = client.get_reservation("r-1").await.into_value().unwrap();
    assert_eq!(fresh.quantity, 5);
    assert_eq!(fresh.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn test_create_invalidates_lists_and_reserved_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 10)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .and(body_json(json!({"product_id": "p-1", "quantity": 4, "reference": "SO-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(reservation_json("r-9", 4, "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reservations/r-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reservation_json("r-9", 4, "pending")))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);
    let all = ReservationQuery::default();

    client.list_reservations(&all).await;
    client.get_product("p-1").await;

    let created = client
        .create_reservation(&NewReservation::new("p-1", 4).with_reference("SO-1"))
        .await
        .into_result()
        .unwrap();
    assert_eq!(created.id, "r-9");

    client.list_reservations(&all).await;
    client.get_product("p-1").await;
    let fetched = client.get_reservation("r-9").await;
    assert!(fetched.is_success());
    assert_eq!(fetched.into_value().unwrap().quantity, 4);
}

#[tokio::test]
async fn test_write_fails_fast_while_breaker_open() {
    let server = MockServer::start().await;
    let (client, _) = client(&server);
    for _ in 0..5 {
        client.breaker().record_failure();
    }

    let result = client.cancel_reservation("r-1").await;

    assert_eq!(result.failure_kind(), Some(ErrorKind::BreakerOpen));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_rejected_write_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("insufficient stock"))
        .expect(1)
        .mount(&server)
        .await;
    let (client, clock) = client(&server);

    let result = client.create_reservation(&NewReservation::new("p-1", 999)).await;

    assert_eq!(result.failure_kind(), Some(ErrorKind::Client));
    assert!(result.error().unwrap().to_string().contains("insufficient stock"));
    assert!(clock.sleeps().is_empty());
    assert_eq!(client.breaker().stats().failure_count, 0);
}

#[tokio::test]
async fn test_failed_write_is_recorded_and_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let result = client
        .update_reservation("r-1", &ReservationUpdate::default())
        .await;

    assert_eq!(result.failure_kind(), Some(ErrorKind::Transient));
    assert_eq!(client.breaker().stats().failure_count, 1);
}

#[tokio::test]
async fn test_cancel_acknowledged_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reservations/r-1/cancel"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    let cancelled = client.cancel_reservation("r-1").await.into_result().unwrap();

    assert_eq!(cancelled.id, "r-1");
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn test_accepted_write_with_unreadable_body_still_invalidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reservations/r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reservation_json("r-1", 2, "pending")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reservations/r-1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ok")))
        .mount(&server)
        .await;
    let (client, _) = client(&server);

    client.get_reservation("r-1").await;
    let result = client.cancel_reservation("r-1").await;
    client.get_reservation("r-1").await;

    assert_eq!(result.failure_kind(), Some(ErrorKind::InvalidResponse));
    assert_eq!(client.breaker().stats().failure_count, 0);
}

#[tokio::test]
async fn test_half_open_trial_closes_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 1)))
        .expect(1)
        .mount(&server)
        .await;
    let clock = ManualClock::shared();
    let config = InventoryConfig::default()
        .with_breaker(CircuitBreakerConfig::new(1, Duration::from_secs(30)));
    let client = client_with(&server, clock.clone(), config);
    client.breaker().record_failure();

    assert!(client.get_product("p-1").await.is_fallback());
    clock.advance(Duration::from_secs(30));
    assert!(client.get_product("p-1").await.is_success());

    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_health_check_reflects_breaker() {
    let server = MockServer::start().await;
    let (client, _) = client(&server);

    let healthy = client.health_check().await;
    assert_eq!(healthy.status, HealthStatus::Up);
    assert!(healthy.cache_reachable);

    for _ in 0..5 {
        client.breaker().record_failure();
    }
    let down = client.health_check().await;
    assert_eq!(down.status, HealthStatus::Down);
    assert_eq!(down.breaker.state, CircuitState::Open);
    assert_eq!(down.breaker.failure_count, 5);
}

#[tokio::test]
async fn test_client_credentials_exchange_is_shared_across_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "exchanged",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer exchanged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p", 1)))
        .expect(2)
        .mount(&server)
        .await;

    let http = http(&server);
    let clock = ManualClock::shared();
    let tokens = TokenManager::new(
        CredentialSource::ClientCredentials(ClientCredentials::new(
            format!("{}/oauth/token", server.uri()),
            "logistics",
            "s3cret",
        )),
        http.clone(),
    )
    .with_clock(clock.clone());
    let client = InventoryClient::builder(http, tokens).clock(clock).build();

    assert!(client.get_product("p-1").await.is_success());
    assert!(client.get_product("p-2").await.is_success());
    assert_eq!(client.tokens().exchange_count(), 1);
}

#[tokio::test]
async fn test_credential_failure_is_distinct_on_writes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let http = http(&server);
    let tokens = TokenManager::new(
        CredentialSource::ClientCredentials(ClientCredentials::new(
            format!("{}/oauth/token", server.uri()),
            "logistics",
            "wrong",
        )),
        http.clone(),
    );
    let client = InventoryClient::builder(http, tokens)
        .clock(ManualClock::shared())
        .build();

    let result = client.create_reservation(&NewReservation::new("p-1", 1)).await;

    assert_eq!(result.failure_kind(), Some(ErrorKind::Credential));
    assert_eq!(request_count(&server).await, 1);
}

#[derive(Debug, Default)]
struct UnreachableCache;

#[async_trait]
impl CacheStore for UnreachableCache {
    async fn get_json(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set_json(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn clear(&self) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_cache_outage_degrades_to_always_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", 3)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(reservation_json("r-1", 1, "pending")))
        .mount(&server)
        .await;
    let http = http(&server);
    let tokens = TokenManager::new(CredentialSource::static_token("t"), http.clone());
    let client = InventoryClient::builder(http, tokens)
        .cache(Arc::new(UnreachableCache))
        .clock(ManualClock::shared())
        .build();

    assert!(client.get_product("p-1").await.is_success());
    assert!(client.get_product("p-1").await.is_success());
    assert!(
        client
            .create_reservation(&NewReservation::new("p-1", 1))
            .await
            .is_success()
    );

    let health = client.health_check().await;
    assert!(!health.cache_reachable);
    assert_eq!(health.status, HealthStatus::Degraded);
}
