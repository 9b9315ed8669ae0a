//! HTTP response wrapper.

use crate::{HttpClientError, Result};
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Longest body excerpt carried in an error.
const ERROR_BODY_LIMIT: usize = 512;

/// A response whose body has been read to the end.
///
/// Buffering up front means the attempt timeout covers the whole exchange
/// and the body can be inspected more than once.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    body: Bytes,
}

impl Response {
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(Self { status, body })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// An empty body parses as JSON `null`, which is what a bare `204` means.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let parsed = if self.body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&self.body)
        };
        parsed.map_err(|e| HttpClientError::Json(e.to_string()))
    }

    /// Turn a 4xx or 5xx into [`HttpClientError::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if !(self.status.is_client_error() || self.status.is_server_error()) {
            return Ok(self);
        }
        let body = match excerpt(&self.text()) {
            "" => self.status.canonical_reason().unwrap_or("no body").to_string(),
            text => text.to_string(),
        };
        Err(HttpClientError::Status {
            status: self.status,
            body,
        })
    }
}

/// Trim `text` to at most [`ERROR_BODY_LIMIT`] bytes on a char boundary.
fn excerpt(text: &str) -> &str {
    let text = text.trim();
    if text.len() <= ERROR_BODY_LIMIT {
        return text;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
