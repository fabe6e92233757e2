//! A scripted in-memory [`Transport`].
//!
//! [`MockTransport`] answers requests from a queue of prepared responses and
//! records every request it receives, so tests can assert exactly which
//! requests were issued and when.
//!
//! # Example
//!
//! ```rust
//! use restmap::clients::{HttpMethod, HttpRequest, HttpResponse, MockTransport, Transport};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new();
//! transport.push_response(HttpResponse::with_body(200, json!({"items": []})));
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "/v1/songs").build().unwrap();
//! let response = transport.request(request).await.unwrap();
//!
//! assert_eq!(response.code, 200);
//! assert_eq!(transport.requests().len(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::clients::errors::HttpError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;

/// Transport answering from a FIFO of scripted results.
///
/// When the script runs dry, requests are answered with a 404 whose body
/// names the unexpected request.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        lock(&self.responses).push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: HttpError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Queues a JSON response with the given status.
    pub fn push_json(&self, code: u16, body: serde_json::Value) {
        self.push_response(HttpResponse::with_body(code, body));
    }

    /// Returns a copy of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the number of scripted results not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;
        tracing::debug!(method = %request.http_method, uri = %request.uri(), "mock request");

        let uri = request.uri();
        let method = request.http_method;
        lock(&self.requests).push(request);

        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Ok(HttpResponse::with_body(
                404,
                serde_json::json!({ "error": format!("no scripted response for {method} {uri}") }),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::errors::InvalidHttpRequestError;
    use crate::clients::http_request::HttpMethod;
    use serde_json::json;

    fn get(path: &str) -> HttpRequest {
        HttpRequest::builder(HttpMethod::Get, path).build().unwrap()
    }

    #[tokio::test]
    async fn test_responses_are_served_in_order() {
        let transport = MockTransport::new();
        transport.push_json(200, json!({"n": 1}));
        transport.push_json(201, json!({"n": 2}));

        let first = transport.request(get("/a")).await.unwrap();
        let second = transport.request(get("/b")).await.unwrap();

        assert_eq!(first.body, json!({"n": 1}));
        assert_eq!(second.code, 201);
        assert_eq!(transport.remaining(), 0);

        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_exhausted_script_answers_404() {
        let transport = MockTransport::new();
        let response = transport.request(get("/v1/songs")).await.unwrap();

        assert_eq!(response.code, 404);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("GET /v1/songs"));
    }

    #[tokio::test]
    async fn test_scripted_error_is_returned() {
        let transport = MockTransport::new();
        transport.push_error(InvalidHttpRequestError::ZeroTries.into());

        let result = transport.request(get("/v1/songs")).await;
        assert!(matches!(result, Err(HttpError::InvalidRequest(_))));
        assert_eq!(transport.request_count(), 1);
    }
}
