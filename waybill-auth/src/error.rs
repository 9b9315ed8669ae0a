// Error types for token management

use thiserror::Error;
use waybill_http_client::HttpClientError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The token endpoint answered with a client error.
    #[error("Token endpoint rejected credentials: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Token exchange failed: {0}")]
    Exchange(#[from] HttpClientError),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Transport failures and 5xx answers may succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Exchange(e) => e.is_retryable(),
            AuthError::Rejected { .. } | AuthError::InvalidResponse(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
