//! Workflows through the `waybill` facade, wired from environment settings.

use serde_json::json;
use waybill::prelude::*;
use waybill::waybill_config::ENV_PREFIX;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> IntegrationSettings {
    let env = EnvLoader::from_vars(
        Some(ENV_PREFIX.to_string()),
        [
            ("WAYBILL_INVENTORY_BASE_URL".to_string(), format!("{}/api", server.uri())),
            ("WAYBILL_INVENTORY_STATIC_TOKEN".to_string(), "env-token".to_string()),
        ],
    );
    IntegrationSettings::from_env(&env).unwrap()
}

#[tokio::test]
async fn test_settings_to_reservation_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .and(header("Authorization", "Bearer env-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "p-1", "name": "Euro pallet", "available": 12}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "r-1", "product_id": "p-1", "quantity": 3, "status": "confirmed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = InventoryClient::from_settings(&settings(&server)).await.unwrap();

    let product = client.get_product("p-1").await;
    assert!(product.is_success());
    assert_eq!(product.value().map(|p| p.available_quantity), Some(12));

    // Second read is served from the cache.
    assert!(client.get_product("p-1").await.is_success());

    let reservation = client
        .create_reservation(&NewReservation::new("p-1", 3).with_reference("SO-7"))
        .await
        .into_result()
        .unwrap();
    assert_eq!(reservation.id, "r-1");
    assert_eq!(reservation.status, ReservationStatus::Confirmed);

    let health = client.health_check().await;
    assert_eq!(health.status, HealthStatus::Up);
    assert_eq!(health.breaker.state, CircuitState::Closed);
}

#[tokio::test]
async fn test_anonymous_settings_are_rejected() {
    let server = MockServer::start().await;
    let mut settings = settings(&server);
    settings.static_token = None;

    let result = InventoryClient::from_settings(&settings).await;
    assert!(matches!(
        result,
        Err(waybill::waybill_inventory::SetupError::MissingCredentials)
    ));
}
