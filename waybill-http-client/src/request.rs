//! Request builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// A single outbound attempt in the making.
///
/// Invalid headers and bodies that fail to encode are remembered and reported
/// by [`send`](RequestBuilder::send), so no request goes out half-built.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    error: Option<HttpClientError>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a HttpClient, method: Method, path: String) -> Self {
        Self {
            client,
            method,
            path,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            error: None,
        }
    }

    /// Ask for a JSON response.
    pub fn accept_json(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        self
    }

    /// Attach a bearer token. The header is marked sensitive so it never
    /// shows up in debug output.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => self.fail(HttpClientError::RequestBuild("token is not a valid header value".into())),
        }
        self
    }

    /// Append query parameters, in order.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Send `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.body = Some(bytes);
            }
            Err(e) => self.fail(HttpClientError::Json(e.to_string())),
        }
        self
    }

    /// Send `form` URL-encoded.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => {
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                self.body = Some(encoded.into_bytes());
            }
            Err(e) => self.fail(HttpClientError::RequestBuild(e.to_string())),
        }
        self
    }

    /// Override the client timeout for this attempt only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn fail(&mut self, error: HttpClientError) {
        self.error.get_or_insert(error);
    }

    /// Send the request.
    ///
    /// Any status is returned as a [`Response`]; use
    /// [`Response::error_for_status`] to turn 4xx/5xx into errors.
    pub async fn send(self) -> Result<Response> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let config = self.client.config();

        let mut url = resolve(config.base_url.as_deref(), &self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut headers = HeaderMap::with_capacity(config.default_headers.len() + self.headers.len());
        for (name, value) in &config.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|_| HttpClientError::RequestBuild(format!("invalid default header {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpClientError::RequestBuild(format!("invalid value for default header {name}")))?;
            headers.insert(name, value);
        }
        headers.extend(self.headers);

        let timeout = self.timeout.unwrap_or(config.timeout);
        let mut request = self
            .client
            .inner()
            .request(self.method, url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = self.body {
            request = request.body(body);
        }

        self.client.execute(request.build()?, timeout).await
    }
}

/// Join a relative path onto the base URL. Absolute URLs are used as given.
fn resolve(base: Option<&str>, path: &str) -> Result<Url> {
    let invalid = |e: url::ParseError| HttpClientError::InvalidUrl(format!("{path}: {e}"));
    match base {
        Some(base) => Url::parse(base).and_then(|base| base.join(path)).map_err(invalid),
        None => Url::parse(path).map_err(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_keeps_base_segments() {
        let url = resolve(Some("https://inv.example.com/api/v2/"), "products/p-1").unwrap();
        assert_eq!(url.as_str(), "https://inv.example.com/api/v2/products/p-1");
    }

    #[test]
    fn test_absolute_url_overrides_base() {
        let url = resolve(Some("https://inv.example.com/api/"), "https://auth.example.com/token").unwrap();
        assert_eq!(url.as_str(), "https://auth.example.com/token");
    }

    #[test]
    fn test_relative_path_without_base_is_invalid() {
        let err = resolve(None, "products").unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }
}
