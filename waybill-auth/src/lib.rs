//! Access-token management for the Waybill integration layer.
//!
//! [`TokenManager`] hands out a bearer token for upstream calls. It either
//! returns a configured static credential or performs an OAuth2
//! client-credentials exchange, caching the issued token until shortly before
//! it expires.
//!
//! ```no_run
//! use waybill_auth::{ClientCredentials, CredentialSource, TokenManager};
//! use waybill_http_client::{HttpClient, HttpClientConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let http = HttpClient::new(HttpClientConfig::default())?;
//! let tokens = TokenManager::new(
//!     CredentialSource::ClientCredentials(ClientCredentials::new(
//!         "https://auth.example.com/oauth/token",
//!         "logistics",
//!         "s3cret",
//!     )),
//!     http,
//! );
//!
//! let bearer = tokens.get_valid_token().await?;
//! # let _ = bearer;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod token;

pub use error::{AuthError, Result as AuthResult};
pub use token::{CachedToken, ClientCredentials, CredentialSource, TokenManager};
