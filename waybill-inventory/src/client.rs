//! The resilient inventory client.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use waybill_auth::{ClientCredentials, CredentialSource, TokenManager};
use waybill_cache::{CacheStore, InMemoryCache, TaggedCache};
use waybill_config::IntegrationSettings;
use waybill_core::{SharedClock, SystemClock};
use waybill_http_client::{
    CircuitBreaker, HttpClient, HttpClientConfig, HttpClientError, Method, RetryExecutor,
    StatusCode,
};

use crate::config::{CacheTtl, InventoryConfig};
use crate::health::HealthReport;
use crate::keys::{self, PRODUCT_LISTS_TAG, RESERVATION_LISTS_TAG};
use crate::mapping;
use crate::model::{
    NewReservation, Product, ProductQuery, Reservation, ReservationQuery, ReservationStatus,
    ReservationUpdate,
};
use crate::result::{IntegrationResult, InventoryError, SetupError};

type Params = Vec<(&'static str, String)>;

struct ReadRequest {
    operation: &'static str,
    key: String,
    tag: Option<&'static str>,
    ttl: Duration,
    path: String,
    query: Params,
}

struct WriteRequest<'a> {
    operation: &'static str,
    method: Method,
    path: String,
    body: Option<Value>,
    reservation_id: Option<&'a str>,
    product_id: Option<&'a str>,
    /// Status implied when the upstream acknowledges with an empty body.
    acknowledged_as: Option<ReservationStatus>,
}

/// Client for the upstream inventory and reservation API.
///
/// Reads are served from the cache when possible and degrade to placeholder
/// values when the upstream is unavailable. Writes fail fast while the
/// circuit breaker is open and invalidate every cached view they affect.
pub struct InventoryClient {
    http: HttpClient,
    tokens: TokenManager,
    cache: TaggedCache<dyn CacheStore>,
    breaker: CircuitBreaker,
    retry: RetryExecutor,
    ttl: CacheTtl,
}

/// Builder for [`InventoryClient`].
pub struct InventoryClientBuilder {
    http: HttpClient,
    tokens: TokenManager,
    config: InventoryConfig,
    cache: Option<Arc<dyn CacheStore>>,
    clock: SharedClock,
}

impl InventoryClientBuilder {
    pub fn config(mut self, config: InventoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing cache store instead of a private in-process one.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Clock for the breaker, the backoff waits and the default cache.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> InventoryClient {
        let clock = self.clock;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryCache::with_clock(clock.clone())));

        InventoryClient {
            http: self.http,
            tokens: self.tokens,
            cache: TaggedCache::with_clock(cache, clock.clone()),
            breaker: CircuitBreaker::with_clock(self.config.breaker, clock.clone()),
            retry: RetryExecutor::with_clock(self.config.retry, clock),
            ttl: self.config.ttl,
        }
    }
}

impl InventoryClient {
    /// Start building a client. `http` must carry the upstream base URL.
    pub fn builder(http: HttpClient, tokens: TokenManager) -> InventoryClientBuilder {
        InventoryClientBuilder {
            http,
            tokens,
            config: InventoryConfig::default(),
            cache: None,
            clock: SystemClock::shared(),
        }
    }

    /// Build the whole stack from loaded settings.
    pub async fn from_settings(settings: &IntegrationSettings) -> Result<Self, SetupError> {
        settings.validate()?;

        let http = HttpClient::new(
            HttpClientConfig::builder()
                .base_url(settings.base_url.as_str())
                .timeout(settings.request_timeout)
                .build(),
        )?;

        let source = if let Some(token) = &settings.static_token {
            CredentialSource::static_token(token.as_str())
        } else if let (Some(id), Some(secret)) = (&settings.client_id, &settings.client_secret) {
            let mut credentials =
                ClientCredentials::new(settings.token_url.as_str(), id.as_str(), secret.as_str());
            if let Some(scope) = &settings.scope {
                credentials = credentials.with_scope(scope.as_str());
            }
            CredentialSource::ClientCredentials(credentials)
        } else {
            return Err(SetupError::MissingCredentials);
        };

        let tokens = TokenManager::new(source, http.clone())
            .with_safety_margin(settings.token_safety_margin);
        let cache = open_cache(settings.cache_url.as_deref()).await?;

        Ok(Self::builder(http, tokens)
            .config(InventoryConfig::from_settings(settings))
            .cache(cache)
            .build())
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn cache(&self) -> &TaggedCache<dyn CacheStore> {
        &self.cache
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Fetch one product by id.
    pub async fn get_product(&self, id: &str) -> IntegrationResult<Product> {
        let request = ReadRequest {
            operation: "get_product",
            key: keys::product(id),
            tag: None,
            ttl: self.ttl.product,
            path: format!("products/{}", urlencoding::encode(id)),
            query: Vec::new(),
        };
        self.read(
            request,
            |body| mapping::map_product(body, Some(id)),
            || Product::placeholder(id),
        )
        .await
    }

    /// List products matching `query`.
    pub async fn list_products(&self, query: &ProductQuery) -> IntegrationResult<Vec<Product>> {
        let request = ReadRequest {
            operation: "list_products",
            key: keys::product_list(query),
            tag: Some(PRODUCT_LISTS_TAG),
            ttl: self.ttl.list,
            path: "products".to_string(),
            query: query.params(),
        };
        self.read(request, mapping::map_products, Vec::new).await
    }

    /// Fetch one reservation by id.
    pub async fn get_reservation(&self, id: &str) -> IntegrationResult<Reservation> {
        let request = ReadRequest {
            operation: "get_reservation",
            key: keys::reservation(id),
            tag: None,
            ttl: self.ttl.reservation,
            path: format!("reservations/{}", urlencoding::encode(id)),
            query: Vec::new(),
        };
        self.read(
            request,
            |body| mapping::map_reservation(body, Some(id)),
            || Reservation::placeholder(id),
        )
        .await
    }

    /// List reservations matching `query`.
    pub async fn list_reservations(
        &self,
        query: &ReservationQuery,
    ) -> IntegrationResult<Vec<Reservation>> {
        let request = ReadRequest {
            operation: "list_reservations",
            key: keys::reservation_list(query),
            tag: Some(RESERVATION_LISTS_TAG),
            ttl: self.ttl.list,
            path: "reservations".to_string(),
            query: query.params(),
        };
        self.read(request, mapping::map_reservations, Vec::new).await
    }

    /// Reserve stock.
    pub async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> IntegrationResult<Reservation> {
        let body = match to_body(reservation) {
            Ok(body) => body,
            Err(e) => return IntegrationResult::Failure(e),
        };
        self.write(WriteRequest {
            operation: "create_reservation",
            method: Method::POST,
            path: "reservations".to_string(),
            body: Some(body),
            reservation_id: None,
            product_id: Some(reservation.product_id.as_str()),
            acknowledged_as: None,
        })
        .await
    }

    /// Change quantity, reference or status of a reservation.
    pub async fn update_reservation(
        &self,
        id: &str,
        update: &ReservationUpdate,
    ) -> IntegrationResult<Reservation> {
        let body = match to_body(update) {
            Ok(body) => body,
            Err(e) => return IntegrationResult::Failure(e),
        };
        self.write(WriteRequest {
            operation: "update_reservation",
            method: Method::PATCH,
            path: format!("reservations/{}", urlencoding::encode(id)),
            body: Some(body),
            reservation_id: Some(id),
            product_id: None,
            acknowledged_as: None,
        })
        .await
    }

    /// Release a reservation.
    pub async fn cancel_reservation(&self, id: &str) -> IntegrationResult<Reservation> {
        self.write(WriteRequest {
            operation: "cancel_reservation",
            method: Method::POST,
            path: format!("reservations/{}/cancel", urlencoding::encode(id)),
            body: None,
            reservation_id: Some(id),
            product_id: None,
            acknowledged_as: Some(ReservationStatus::Cancelled),
        })
        .await
    }

    /// Breaker state and cache reachability.
    pub async fn health_check(&self) -> HealthReport {
        let cache_reachable = self.cache.store().health_check().await;
        HealthReport::new(self.breaker.stats(), cache_reachable)
    }

    async fn read<T, M, F>(&self, request: ReadRequest, map: M, fallback: F) -> IntegrationResult<T>
    where
        T: Serialize + DeserializeOwned,
        M: FnOnce(&Value) -> Result<T, InventoryError>,
        F: FnOnce() -> T,
    {
        let ReadRequest {
            operation,
            key,
            tag,
            ttl,
            path,
            query,
        } = request;

        match waybill_cache::get::<_, T>(&**self.cache.store(), &key).await {
            Ok(Some(value)) => {
                debug!(operation, %key, "Cache hit");
                return IntegrationResult::Success(value);
            }
            Ok(None) => {}
            Err(e) => warn!(operation, %key, error = %e, "Cache read failed, treating as miss"),
        }

        if self.breaker.is_open() {
            warn!(operation, "Circuit breaker open, returning fallback");
            return IntegrationResult::Fallback(fallback());
        }

        let outcome = self
            .call(Method::GET, &path, &query, None)
            .await
            .and_then(|body| map(&body));

        match outcome {
            Ok(value) => {
                self.store(&key, &value, tag, ttl).await;
                self.breaker.record_success();
                IntegrationResult::Success(value)
            }
            Err(e) => {
                self.record_error(&e);
                warn!(
                    operation,
                    kind = %e.kind(),
                    error = %e,
                    "Upstream read failed, returning fallback"
                );
                IntegrationResult::Fallback(fallback())
            }
        }
    }

    async fn write(&self, request: WriteRequest<'_>) -> IntegrationResult<Reservation> {
        let WriteRequest {
            operation,
            method,
            path,
            body,
            reservation_id,
            product_id,
            acknowledged_as,
        } = request;

        if self.breaker.is_open() {
            warn!(operation, "Circuit breaker open, rejecting write");
            return IntegrationResult::Failure(InventoryError::BreakerOpen);
        }

        let payload = match self.call(method, &path, &[], body.as_ref()).await {
            Ok(payload) => payload,
            Err(e) => {
                self.record_error(&e);
                warn!(operation, kind = %e.kind(), error = %e, "Upstream write failed");
                return IntegrationResult::Failure(e);
            }
        };

        let mapped = match (acknowledged_as, reservation_id) {
            (Some(status), Some(id)) if payload.is_null() => Ok(Reservation {
                status,
                ..Reservation::placeholder(id)
            }),
            _ => mapping::map_reservation(&payload, reservation_id),
        };

        let affected_reservation = reservation_id
            .map(str::to_owned)
            .or_else(|| mapped.as_ref().ok().map(|r| r.id.clone()))
            .filter(|id| !id.is_empty());
        let affected_product = product_id
            .map(str::to_owned)
            .or_else(|| mapped.as_ref().ok().map(|r| r.product_id.clone()))
            .filter(|id| !id.is_empty());
        self.invalidate(affected_reservation.as_deref(), affected_product.as_deref())
            .await;
        self.breaker.record_success();

        match mapped {
            Ok(reservation) => {
                info!(operation, reservation_id = %reservation.id, "Write accepted");
                IntegrationResult::Success(reservation)
            }
            Err(e) => {
                warn!(operation, error = %e, "Write accepted but response could not be mapped");
                IntegrationResult::Failure(e)
            }
        }
    }

    /// One logical upstream call under the retry policy.
    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, InventoryError> {
        self.retry
            .execute(
                move || self.attempt(method.clone(), path, query, body),
                InventoryError::retryability,
            )
            .await
            .map_err(|e| {
                debug!(attempts = e.attempts, %path, "Giving up on upstream call");
                e.into_inner()
            })
    }

    async fn attempt(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, InventoryError> {
        let token = self.tokens.get_valid_token().await?;

        let mut request = self
            .http
            .request(method, path)
            .bearer_auth(&token)
            .accept_json();
        if !query.is_empty() {
            request = request.queries(query.iter().map(|(name, value)| (*name, value.as_str())));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // The token was revoked upstream; the next call exchanges again.
            self.tokens.invalidate().await;
        }
        let response = response.error_for_status()?;

        response
            .json()
            .map_err(|e| InventoryError::InvalidResponse(e.to_string()))
    }

    fn record_error(&self, error: &InventoryError) {
        if error.counts_against_breaker() {
            self.breaker.record_failure();
        } else {
            self.breaker.record_success();
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, tag: Option<&str>, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(%key, error = %e, "Could not serialize value for cache");
                return;
            }
        };
        let result = match tag {
            Some(tag) => self.cache.set_with_tags(key, json, &[tag], ttl).await,
            None => self.cache.store().set_json(key, json, ttl).await,
        };
        if let Err(e) = result {
            warn!(%key, error = %e, "Cache write failed");
        }
    }

    async fn invalidate(&self, reservation_id: Option<&str>, product_id: Option<&str>) {
        let stale = reservation_id
            .map(keys::reservation)
            .into_iter()
            .chain(product_id.map(keys::product));
        for key in stale {
            if let Err(e) = self.cache.delete(&key).await {
                warn!(%key, error = %e, "Cache invalidation failed");
            }
        }
        if let Err(e) = self
            .cache
            .invalidate_tags(&[RESERVATION_LISTS_TAG, PRODUCT_LISTS_TAG])
            .await
        {
            warn!(error = %e, "Cache list invalidation failed");
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, InventoryError> {
    serde_json::to_value(value)
        .map_err(|e| InventoryError::Upstream(HttpClientError::Json(e.to_string())))
}

async fn open_cache(url: Option<&str>) -> Result<Arc<dyn CacheStore>, SetupError> {
    match url {
        None => Ok(Arc::new(InMemoryCache::new())),
        #[cfg(feature = "redis")]
        Some(url) => {
            let cache = waybill_cache::RedisCache::connect(url)
                .await?
                .with_key_prefix("waybill");
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        Some(url) => Err(SetupError::UnsupportedCache(url.to_string())),
    }
}
