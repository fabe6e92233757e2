//! The command-layer contract.

use async_trait::async_trait;

use crate::clients::errors::HttpError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;

/// Issues requests for resolved resource paths.
///
/// Implementations return `Ok` for every response received from the server,
/// whatever its status, so callers can tell HTTP 4xx/5xx apart from
/// transport failures. `Err` is reserved for failures to exchange a
/// request at all: network errors, timeouts, codec failures, invalid
/// requests and retry exhaustion.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the decoded response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when no response could be obtained.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

