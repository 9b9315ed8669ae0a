//! Bearer token acquisition and caching.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use waybill_core::{SharedClock, SystemClock};
use waybill_http_client::HttpClient;

use crate::error::{AuthError, Result};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);
/// Longer advertised lifetimes are clamped to this.
const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Client-credentials grant parameters.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scope: Option<String>,
}

impl ClientCredentials {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            scope: None,
        }
    }

    /// Request a specific scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Where bearer tokens come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Fixed override credential; no exchange is ever performed.
    Static(SecretString),
    /// OAuth2 client-credentials exchange.
    ClientCredentials(ClientCredentials),
}

impl CredentialSource {
    /// Static override credential.
    pub fn static_token(token: impl Into<String>) -> Self {
        CredentialSource::Static(SecretString::from(token.into()))
    }
}

/// An issued token and the instant after which it must not be used.
#[derive(Clone)]
pub struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default, alias = "accessToken", alias = "token")]
    access_token: Option<String>,
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        secs.map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME)
            .min(MAX_LIFETIME)
    }
}

/// Hands out valid bearer tokens, exchanging credentials only when needed.
///
/// The issued token is cached until `lifetime - safety_margin`. Concurrent
/// callers that find the slot expired are coalesced into one exchange.
#[derive(Debug)]
pub struct TokenManager {
    source: CredentialSource,
    http: HttpClient,
    clock: SharedClock,
    safety_margin: Duration,
    slot: RwLock<Option<CachedToken>>,
    refresh: Mutex<()>,
    exchanges: AtomicU64,
}

impl TokenManager {
    pub fn new(source: CredentialSource, http: HttpClient) -> Self {
        Self {
            source,
            http,
            clock: SystemClock::shared(),
            safety_margin: Duration::from_secs(300),
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
            exchanges: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// How long before the issued expiry a token is considered stale.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Number of credential exchanges performed so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Return a token valid right now, exchanging credentials if needed.
    pub async fn get_valid_token(&self) -> Result<String> {
        let credentials = match &self.source {
            CredentialSource::Static(token) => return Ok(token.expose_secret().to_owned()),
            CredentialSource::ClientCredentials(credentials) => credentials,
        };

        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _refresh = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let issued = self.exchange(credentials).await?;
        let value = issued.value.clone();
        *self.slot.write().await = Some(issued);
        Ok(value)
    }

    /// Drop the cached token so the next call exchanges again.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    async fn cached(&self) -> Option<String> {
        let now = self.clock.now();
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .map(|token| token.value.clone())
    }

    async fn exchange(&self, credentials: &ClientCredentials) -> Result<CachedToken> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
        ];
        if let Some(scope) = &credentials.scope {
            form.push(("scope", scope.as_str()));
        }

        debug!(token_url = %credentials.token_url, "Exchanging client credentials");
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http
            .post(credentials.token_url.as_str())
            .accept_json()
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let message = response.text();
            warn!(status = status.as_u16(), "Token endpoint rejected credentials");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let response = response.error_for_status()?;

        let body: TokenResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let lifetime = body.lifetime();
        let value = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::InvalidResponse("missing access token".into()))?;

        if lifetime <= self.safety_margin {
            warn!(
                ?lifetime,
                margin = ?self.safety_margin,
                "Token lifetime is within the safety margin"
            );
        }
        let expires_at = self
            .clock
            .now()
            .checked_add(lifetime.saturating_sub(self.safety_margin))
            .ok_or_else(|| AuthError::InvalidResponse("token lifetime out of range".into()))?;
        info!(?lifetime, "Obtained access token");

        Ok(CachedToken { value, expires_at })
    }
}
