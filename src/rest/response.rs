//! Page decoding conventions.
//!
//! [`PageFormat`] describes how list responses are shaped and how the
//! pagination cursor travels between responses and requests. [`Page`] is
//! one decoded list response: raw item payloads plus the next cursor.
//!
//! # Formats
//!
//! The default format expects bodies like:
//!
//! ```json
//! { "items": [{"_type": "song", "uri": "/v1/songs/s1", "id": "s1"}], "next_cursor": "abc" }
//! ```
//!
//! and sends the cursor back as `?cursor=abc`. APIs that page through the
//! `Link` header use [`CursorSource::LinkHeader`]; bare JSON arrays are
//! accepted as item lists in both cases.

use serde_json::Value;

use crate::clients::HttpResponse;
use crate::rest::errors::ResourceError;

/// Where the next-page cursor is found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorSource {
    /// A string field of the page body. A missing, `null` or empty field ends
    /// the iteration.
    BodyField {
        /// The body field name.
        field: String,
    },
    /// The `rel="next"` URL of the `Link` header, read from the query
    /// parameter named by [`PageFormat::cursor_param`].
    LinkHeader,
}

/// How list responses are shaped and how cursors round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFormat {
    /// The body field holding the item list (default `items`).
    pub items_field: String,
    /// Where the next cursor is found (default body field `next_cursor`).
    pub cursor: CursorSource,
    /// The request parameter carrying the cursor (default `cursor`).
    pub cursor_param: String,
    /// The request parameter carrying the page size (default `limit`).
    pub limit_param: String,
    /// The payload field holding the type discriminator (default `_type`).
    pub type_field: String,
    /// The payload field holding a resource's URI (default `uri`).
    pub uri_field: String,
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            items_field: "items".to_string(),
            cursor: CursorSource::BodyField {
                field: "next_cursor".to_string(),
            },
            cursor_param: "cursor".to_string(),
            limit_param: "limit".to_string(),
            type_field: "_type".to_string(),
            uri_field: "uri".to_string(),
        }
    }
}

impl PageFormat {
    /// Link-header paging with the cursor in `param` (e.g. `page_info`).
    #[must_use]
    pub fn link_header(param: impl Into<String>) -> Self {
        Self {
            cursor: CursorSource::LinkHeader,
            cursor_param: param.into(),
            ..Self::default()
        }
    }
}

/// One decoded list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Raw item payloads, in server order.
    pub items: Vec<Value>,
    /// The cursor for the next page, if there is one.
    pub next_cursor: Option<String>,
    /// The `X-Request-Id` of the response.
    pub request_id: Option<String>,
}

impl Page {
    /// Decodes a successful list response.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPayload`] if the body is neither an
    /// item array nor an object holding one under `format.items_field`.
    pub fn from_http_response(
        response: &HttpResponse,
        format: &PageFormat,
        resource: &str,
    ) -> Result<Self, ResourceError> {
        let items = match &response.body {
            Value::Array(items) => items.clone(),
            Value::Object(map) => match map.get(&format.items_field) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None if map.is_empty() => Vec::new(),
                _ => {
                    return Err(ResourceError::InvalidPayload {
                        resource: resource.to_string(),
                        reason: format!("page has no '{}' array", format.items_field),
                    });
                }
            },
            Value::Null => Vec::new(),
            other => {
                return Err(ResourceError::InvalidPayload {
                    resource: resource.to_string(),
                    reason: format!("page body is not a list: {other}"),
                });
            }
        };

        let next_cursor = match &format.cursor {
            CursorSource::BodyField { field } => response
                .body
                .get(field)
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(ToString::to_string),
            CursorSource::LinkHeader => response.pagination(&format.cursor_param).next_cursor,
        };

        Ok(Self {
            items,
            next_cursor,
            request_id: response.request_id().map(ToString::to_string),
        })
    }

    /// Returns `true` if another page can be requested.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.next_cursor.is_some()
    }
}
