//! Resource-layer error types.
//!
//! This module contains [`ResourceError`], the error type of every resource
//! and query operation. It composes the lower layers
//! ([`RegistryError`](crate::rest::RegistryError) and
//! [`HttpError`](crate::clients::HttpError)) and adds resource semantics.
//!
//! # Error Handling
//!
//! Response statuses are mapped to semantic variants:
//!
//! - **404**: [`ResourceError::NotFound`]
//! - **409**: [`ResourceError::Conflict`]
//! - **400 / 422**: [`ResourceError::ValidationFailed`]
//! - **Other non-2xx**: [`ResourceError::Transport`] wrapping [`HttpError::Response`]
//!
//! Build-time failures ([`UnresolvableUri`](ResourceError::UnresolvableUri),
//! [`InvalidFilter`](ResourceError::InvalidFilter), registry errors) are
//! returned synchronously, before any request is made.
//!
//! # Example
//!
//! ```rust,ignore
//! use restmap::rest::ResourceError;
//!
//! match song.save(&client).await {
//!     Ok(()) => println!("saved at {:?}", song.uri()),
//!     Err(ResourceError::ValidationFailed { errors, .. }) => {
//!         for (field, messages) in errors {
//!             println!("{}: {:?}", field, messages);
//!         }
//!     }
//!     Err(ResourceError::Conflict { uri, .. }) => println!("{uri} changed on the server"),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

use std::collections::HashMap;

use crate::clients::{HttpError, HttpResponse, HttpResponseError};
use crate::rest::registry::RegistryError;
use thiserror::Error;

/// Error type for resource and query operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A path cannot be resolved: an identifier or parent is missing.
    #[error("Cannot resolve URI for {resource}::{operation}: {reason}")]
    UnresolvableUri {
        /// The resource type name.
        resource: String,
        /// The operation being attempted (e.g., "find", "all", "delete").
        operation: &'static str,
        /// Why resolution failed.
        reason: String,
    },

    /// A filter or sort names a field path the resource type does not declare,
    /// or cannot be encoded.
    #[error("Invalid filter on {resource}.{field}: {reason}")]
    InvalidFilter {
        /// The resource type name.
        resource: String,
        /// The offending field path.
        field: String,
        /// Why the filter was rejected.
        reason: String,
    },

    /// A payload value does not match the declared field kind.
    #[error("Invalid value for {resource}.{field}: {reason}")]
    InvalidField {
        /// The resource type name.
        resource: String,
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A response payload does not have the expected shape.
    #[error("Unexpected payload for {resource}: {reason}")]
    InvalidPayload {
        /// The resource type name.
        resource: String,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The resource was not found (HTTP 404).
    #[error("{resource} at {uri} not found")]
    NotFound {
        /// The resource type name.
        resource: String,
        /// The URI that was requested.
        uri: String,
    },

    /// The server rejected the change as conflicting (HTTP 409).
    #[error("Conflict while writing {resource} at {uri}")]
    Conflict {
        /// The resource type name.
        resource: String,
        /// The URI that was written.
        uri: String,
        /// The request ID for debugging (from X-Request-Id header).
        request_id: Option<String>,
    },

    /// The server rejected the payload (HTTP 400/422).
    #[error("Validation failed: {errors:?}")]
    ValidationFailed {
        /// A map of field names to error messages.
        errors: HashMap<String, Vec<String>>,
        /// The request ID for debugging (from X-Request-Id header).
        request_id: Option<String>,
    },

    /// `.one()` found more than one result.
    #[error("Expected one {resource} but found several")]
    MultipleResults {
        /// The resource type name.
        resource: String,
    },

    /// `.one()` found no result.
    #[error("Expected one {resource} but found none")]
    NoResult {
        /// The resource type name.
        resource: String,
    },

    /// The API does not support the operation for this resource type.
    #[error("{operation} is not supported for {resource}")]
    Unsupported {
        /// The resource type name.
        resource: String,
        /// The unsupported operation.
        operation: &'static str,
    },

    /// A registry lookup or registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A transport-level error occurred, or a status with no specific mapping.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

impl ResourceError {
    /// Creates a `ResourceError` from a non-2xx response.
    ///
    /// # Example
    ///
    /// ```rust
    /// use restmap::rest::ResourceError;
    /// use serde_json::json;
    ///
    /// let error = ResourceError::from_http_response(
    ///     404,
    ///     &json!({"error": "Not found"}),
    ///     "song",
    ///     "/v1/songs/s1",
    ///     Some("req-123"),
    /// );
    /// assert!(matches!(error, ResourceError::NotFound { .. }));
    /// ```
    #[must_use]
    pub fn from_http_response(
        code: u16,
        body: &serde_json::Value,
        resource: &str,
        uri: &str,
        request_id: Option<&str>,
    ) -> Self {
        match code {
            404 => Self::NotFound {
                resource: resource.to_string(),
                uri: uri.to_string(),
            },
            409 => Self::Conflict {
                resource: resource.to_string(),
                uri: uri.to_string(),
                request_id: request_id.map(ToString::to_string),
            },
            400 | 422 => Self::ValidationFailed {
                errors: parse_validation_errors(body),
                request_id: request_id.map(ToString::to_string),
            },
            _ => Self::Transport(HttpError::Response(HttpResponseError {
                code,
                message: body.to_string(),
                error_reference: request_id.map(ToString::to_string),
            })),
        }
    }

    /// Maps a non-2xx response to an error, passing 2xx responses through.
    pub(crate) fn ensure_success(
        response: &HttpResponse,
        resource: &str,
        uri: &str,
    ) -> Result<(), Self> {
        if response.is_ok() {
            return Ok(());
        }
        Err(Self::from_http_response(
            response.code,
            &response.body,
            resource,
            uri,
            response.request_id(),
        ))
    }

    /// Returns the request ID if available.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { request_id, .. } | Self::Conflict { request_id, .. } => {
                request_id.as_deref()
            }
            Self::Transport(HttpError::Response(e)) => e.error_reference.as_deref(),
            Self::Transport(HttpError::MaxRetries(e)) => e.error_reference.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for errors raised by the transport rather than the API.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Parses validation errors from a response body.
///
/// Accepts a field map (`{"errors": {"name": ["can't be blank"]}}`), a list
/// (`{"errors": ["..."]}`), a single string, or a top-level `description`.
fn parse_validation_errors(body: &serde_json::Value) -> HashMap<String, Vec<String>> {
    let mut result = HashMap::new();

    match body.get("errors") {
        Some(serde_json::Value::Object(map)) => {
            for (field, messages) in map {
                let msgs: Vec<String> = match messages {
                    serde_json::Value::Array(arr) => arr
                        .iter()
                        .map(|v| v.as_str().map_or_else(|| v.to_string(), ToString::to_string))
                        .collect(),
                    serde_json::Value::String(s) => vec![s.clone()],
                    _ => vec![messages.to_string()],
                };
                result.insert(field.clone(), msgs);
            }
        }
        Some(serde_json::Value::Array(arr)) => {
            let msgs: Vec<String> = arr
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect();
            if !msgs.is_empty() {
                result.insert("base".to_string(), msgs);
            }
        }
        Some(serde_json::Value::String(s)) => {
            result.insert("base".to_string(), vec![s.clone()]);
        }
        _ => {
            if let Some(description) = body.get("description").and_then(|d| d.as_str()) {
                result.insert("base".to_string(), vec![description.to_string()]);
            }
        }
    }

    result
}

// Verify ResourceError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceError>();
};
