//! HTTP command layer.
//!
//! This module provides the transport the resource layer runs on: request
//! and response types, the [`Transport`] contract, its `reqwest`-backed
//! implementation and a scripted mock.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`Transport`]: The command-layer contract, one request in, one response out
//! - [`HttpClient`]: The async HTTP client for API communication
//! - [`MockTransport`]: Scripted responses and recorded requests, for tests
//! - [`HttpRequest`]: A request to be sent to the API
//! - [`HttpResponse`]: A decoded response from the API
//! - [`HttpMethod`]: Supported HTTP methods (GET, POST, PUT, PATCH, DELETE)
//! - [`Codec`]: The pluggable body serializer, [`JsonCodec`] by default
//! - [`RestClient`]: The entry point of the resource layer
//!
//! # Example
//!
//! ```rust,no_run
//! use restmap::clients::{HttpClient, HttpMethod, HttpRequest, Transport};
//! use restmap::{ClientConfig, RootUrl};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .root_url(RootUrl::new("https://api.example.com")?)
//!     .build()?;
//! let client = HttpClient::new(&config)?;
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "/v1/playlists")
//!     .query_param("tags.contains", "nuti")
//!     .build()?;
//!
//! let response = client.request(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Retry Behavior
//!
//! The client implements automatic retry logic for transient failures:
//!
//! - **429 (Rate Limited)**: Retries using `Retry-After` header value, or 1 second if not present
//! - **5xx (Server Error)**: Retries with fixed 1-second delay
//! - **Other errors (4xx)**: Returns immediately without retry
//!
//! The default `tries` is 1, meaning no automatic retries. Configure via
//! [`HttpRequest::builder`] with `.tries(n)` to enable retries.

mod codec;
mod errors;
mod http_client;
mod http_request;
mod http_response;
mod mock;
pub mod rest;
mod transport;

pub use codec::{Codec, JsonCodec};
pub use errors::{
    CodecError, HttpError, HttpResponseError, InvalidHttpRequestError,
    MaxHttpRetriesExceededError,
};
pub use http_client::{HttpClient, RETRY_WAIT_TIME};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{HttpResponse, PaginationInfo};
pub use mock::MockTransport;
pub use transport::Transport;

// Re-export the REST client at the clients module level
pub use rest::RestClient;
