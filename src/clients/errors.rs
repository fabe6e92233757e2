//! Transport-level error types.
//!
//! This module contains error types for the command layer: failures that
//! happen while moving a request to the server and a response back.
//!
//! # Error Handling
//!
//! - [`HttpResponseError`]: A non-2xx response that has no more specific mapping
//! - [`MaxHttpRetriesExceededError`]: When retry attempts are exhausted
//! - [`InvalidHttpRequestError`]: When a request fails validation before sending
//! - [`CodecError`]: When a body cannot be encoded or decoded
//! - [`HttpError`]: Unified error type encompassing all of the above
//!
//! A [`Transport`](crate::clients::Transport) returns `Ok` for every response
//! it receives, whatever the status. Status interpretation happens in the
//! resource layer, which maps well-known statuses onto
//! [`ResourceError`](crate::rest::ResourceError) variants and wraps the rest
//! in [`HttpError::Response`].
//!
//! # Example
//!
//! ```rust
//! use restmap::clients::{HttpError, HttpResponseError};
//!
//! let error = HttpError::Response(HttpResponseError {
//!     code: 503,
//!     message: r#"{"error":"Unavailable"}"#.to_string(),
//!     error_reference: None,
//! });
//!
//! match error {
//!     HttpError::Response(e) => assert_eq!(e.code, 503),
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

/// Error describing a non-successful response.
///
/// The message field contains JSON with any of these fields from the response:
/// - `errors`: Array or map of error messages
/// - `error`: Single error message
/// - `description`: Description of the error
/// - `error_reference`: Debugging reference including the request id
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error message in JSON format.
    pub message: String,
    /// Reference ID for error reporting (from the `X-Request-Id` header).
    pub error_reference: Option<String>,
}

/// Error returned when maximum retry attempts have been exhausted.
///
/// Raised when a request keeps receiving 429 or 5xx responses after all
/// configured attempts have been made.
///
/// # Example
///
/// ```rust
/// use restmap::clients::MaxHttpRetriesExceededError;
///
/// let error = MaxHttpRetriesExceededError {
///     code: 429,
///     tries: 3,
///     message: r#"{"error":"Rate limited"}"#.to_string(),
///     error_reference: None,
/// };
///
/// assert!(error.to_string().starts_with("Exceeded maximum retry count of 3."));
/// ```
#[derive(Debug, Error)]
#[error("Exceeded maximum retry count of {tries}. Last message: {message}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of tries that were attempted.
    pub tries: u32,
    /// Serialized error message from the last response.
    pub message: String,
    /// Reference ID for error reporting (from the `X-Request-Id` header).
    pub error_reference: Option<String>,
}

/// Error returned when an HTTP request fails validation before sending.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The request has no path.
    #[error("Cannot send a request without a path.")]
    EmptyPath,

    /// A POST, PUT or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The request allows zero attempts.
    #[error("A request must allow at least one attempt.")]
    ZeroTries,
}

/// Error returned when a body cannot be serialized or deserialized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Could not {action} body with content type {content_type}: {message}")]
pub struct CodecError {
    /// `"encode"` or `"decode"`.
    pub action: &'static str,
    /// The content type involved.
    pub content_type: String,
    /// Details from the underlying serializer.
    pub message: String,
}

/// Unified error type for all transport-related errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A non-2xx response with no more specific mapping.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Maximum retry attempts exhausted.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network, connection or timeout error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
