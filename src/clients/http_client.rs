//! HTTP client for API communication.
//!
//! This module provides the [`HttpClient`] type, the `reqwest`-backed
//! [`Transport`] with automatic retry handling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::codec::{Codec, JsonCodec};
use crate::clients::errors::{HttpError, MaxHttpRetriesExceededError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;
use crate::config::{ClientConfig, RequestHooks, RootUrl};

/// Fixed retry wait time in seconds when no `Retry-After` header is sent.
pub const RETRY_WAIT_TIME: u64 = 1;

/// HTTP client for making requests to the API.
///
/// The client handles:
/// - URL construction from the configured root URL
/// - Default headers including `User-Agent`, `Accept` and basic auth
/// - Automatic retry logic for 429 and 5xx responses
/// - Body encoding and decoding through a [`Codec`]
/// - The configured [`RequestHooks`], run around every attempt
///
/// Every received response is returned as `Ok`, including 4xx and 5xx
/// statuses once retries are exhausted on a single-try request. Callers
/// map statuses to errors.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,no_run
/// use restmap::clients::{HttpClient, HttpMethod, HttpRequest, Transport};
/// use restmap::{ClientConfig, RootUrl};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::builder()
///     .root_url(RootUrl::new("https://api.example.com")?)
///     .build()?;
/// let client = HttpClient::new(&config)?;
///
/// let request = HttpRequest::builder(HttpMethod::Get, "/v1/songs").build()?;
/// let response = client.request(request).await?;
/// println!("{}", response.code);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpClient {
    /// The internal reqwest HTTP client.
    client: reqwest::Client,
    /// Root URL every path is joined onto.
    root_url: RootUrl,
    /// Default headers to include in all requests.
    default_headers: HashMap<String, String>,
    /// Body serialization.
    codec: Arc<dyn Codec>,
    /// Promotes request/response logging from `debug` to `info`.
    echo: bool,
    /// Callbacks run around every attempt.
    hooks: RequestHooks,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client using JSON bodies.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (for example on TLS initialization failure).
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        Self::with_codec(config, Arc::new(JsonCodec))
    }

    /// Creates a new HTTP client with a custom body codec.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created.
    pub fn with_codec(config: &ClientConfig, codec: Arc<dyn Codec>) -> Result<Self, HttpError> {
        let mut default_headers = HashMap::new();
        if let Some(user_agent) = config.user_agent_header() {
            default_headers.insert("User-Agent".to_string(), user_agent);
        }
        default_headers.insert("Accept".to_string(), codec.content_type().to_string());
        if let Some(auth) = config.auth() {
            default_headers.insert("Authorization".to_string(), auth.header_value());
        }
        for (name, value) in config.headers() {
            default_headers.insert(name.clone(), value.clone());
        }

        let redirect = if config.allow_redirects() {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(redirect);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            root_url: config.root_url().clone(),
            default_headers,
            codec,
            echo: config.echo(),
            hooks: config.hooks().clone(),
        })
    }

    /// Returns the root URL for this client.
    #[must_use]
    pub const fn root_url(&self) -> &RootUrl {
        &self.root_url
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    fn log_request(&self, request: &HttpRequest, attempt: u32) {
        if self.echo {
            tracing::info!(method = %request.http_method, uri = %request.uri(), attempt, "sending request");
        } else {
            tracing::debug!(method = %request.http_method, uri = %request.uri(), attempt, "sending request");
        }
    }

    fn log_response(&self, request: &HttpRequest, response: &HttpResponse) {
        if self.echo {
            tracing::info!(method = %request.http_method, uri = %request.uri(), status = response.code, body = %response.body, "received response");
        } else {
            tracing::debug!(method = %request.http_method, uri = %request.uri(), status = response.code, "received response");
        }
    }

    async fn send_once(
        &self,
        request: &HttpRequest,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, HttpError> {
        let mut req_builder = match request.http_method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        for (key, value) in headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(bytes) = body {
            req_builder = req_builder.body(bytes.to_vec());
        }

        let res = req_builder.send().await?;

        let code = res.status().as_u16();
        let res_headers = Self::parse_response_headers(res.headers());
        let bytes = res.bytes().await?;
        let content_type = res_headers
            .get("content-type")
            .and_then(|values| values.first())
            .map(String::as_str);

        let body = match self.codec.deserialize(content_type, &bytes) {
            Ok(body) => body,
            // Error pages are not always encoded with the API's codec.
            Err(_) if !(200..=299).contains(&code) => {
                serde_json::json!({ "raw_body": String::from_utf8_lossy(&bytes) })
            }
            Err(e) => return Err(e.into()),
        };

        Ok(HttpResponse::new(code, res_headers, body))
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// Calculates the retry delay: `Retry-After` if present, otherwise a fixed delay.
    fn calculate_retry_delay(response: &HttpResponse) -> Duration {
        response
            .retry_request_after
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map_or(Duration::from_secs(RETRY_WAIT_TIME), Duration::from_secs_f64)
    }
}

#[async_trait]
impl Transport for HttpClient {
    /// Sends a request, retrying 429 and 5xx responses up to `request.tries`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error or timeout occurs (`Network`)
    /// - The body cannot be encoded or a 2xx body cannot be decoded (`Codec`)
    /// - Retries were requested and exhausted (`MaxRetries`)
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = self.root_url.join(&request.uri());

        let mut headers = self.default_headers.clone();
        let body = match &request.body {
            Some(value) => {
                let (content_type, bytes) = self.codec.serialize(value)?;
                headers.insert("Content-Type".to_string(), content_type);
                Some(bytes)
            }
            None => None,
        };
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                headers.insert(key.clone(), value.clone());
            }
        }

        let mut tries: u32 = 0;
        loop {
            tries += 1;
            self.log_request(&request, tries);

            let mut attempt_headers = headers.clone();
            self.hooks
                .before_request(request.http_method, &url, &mut attempt_headers);
            let response = self
                .send_once(&request, &url, &attempt_headers, body.as_deref())
                .await?;
            self.hooks.after_response(&response);
            self.log_response(&request, &response);

            if !response.is_retryable() || request.tries == 1 {
                return Ok(response);
            }

            if tries >= request.tries {
                tracing::warn!(
                    method = %request.http_method,
                    uri = %request.uri(),
                    status = response.code,
                    "Exceeded maximum retry count of {}",
                    request.tries
                );
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code: response.code,
                    tries: request.tries,
                    message: response.serialize_error(),
                    error_reference: response.request_id().map(String::from),
                }));
            }

            let delay = Self::calculate_retry_delay(&response);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicAuth;

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .root_url(RootUrl::new("https://api.example.com").unwrap())
            .client_agent("example-client/1.0")
            .user_agent("consumer/2.0")
            .auth(BasicAuth::new("bob", "passwerd").unwrap())
            .header("X-Cup-Of", "Coffee")
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_construction() {
        let client = HttpClient::new(&config()).unwrap();
        assert_eq!(client.root_url().as_ref(), "https://api.example.com");
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = HttpClient::new(&config()).unwrap();
        assert_eq!(
            client.default_headers().get("User-Agent").map(String::as_str),
            Some("example-client/1.0 consumer/2.0")
        );
    }

    #[test]
    fn test_auth_and_configured_headers() {
        let client = HttpClient::new(&config()).unwrap();
        assert_eq!(
            client.default_headers().get("Authorization").map(String::as_str),
            Some("Basic Ym9iOnBhc3N3ZXJk")
        );
        assert_eq!(
            client.default_headers().get("X-Cup-Of").map(String::as_str),
            Some("Coffee")
        );
    }

    #[test]
    fn test_no_user_agent_or_auth_when_unset() {
        let config = ClientConfig::builder()
            .root_url(RootUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();

        assert!(client.default_headers().get("User-Agent").is_none());
        assert!(client.default_headers().get("Authorization").is_none());
        assert_eq!(
            client.default_headers().get("Accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_retry_delay_uses_retry_after() {
        let response = HttpResponse::with_body(429, serde_json::json!({})).header("Retry-After", "0");
        assert_eq!(HttpClient::calculate_retry_delay(&response), Duration::ZERO);

        let response = HttpResponse::with_body(503, serde_json::json!({}));
        assert_eq!(
            HttpClient::calculate_retry_delay(&response),
            Duration::from_secs(RETRY_WAIT_TIME)
        );
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpClient>();
    }
}
