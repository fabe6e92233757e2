//! HTTP response types.
//!
//! This module provides the [`HttpResponse`] type and the `Link` header
//! parser used by [`CursorSource::LinkHeader`](crate::rest::CursorSource).

use std::collections::HashMap;

/// Pagination information parsed from the `Link` header.
///
/// APIs that page through `Link` headers carry an opaque cursor as a query
/// parameter (for example `page_info` or `cursor`) of the linked URLs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// The cursor value for the previous page, if available.
    pub prev_cursor: Option<String>,
    /// The cursor value for the next page, if available.
    pub next_cursor: Option<String>,
}

impl PaginationInfo {
    /// Parses pagination info from a Link header value.
    ///
    /// The Link header format is:
    /// `<url>; rel="next", <url>; rel="previous"`
    ///
    /// `param` names the query parameter carrying the cursor.
    ///
    /// # Example
    ///
    /// ```rust
    /// use restmap::clients::PaginationInfo;
    ///
    /// let info = PaginationInfo::parse_link_header(
    ///     r#"<https://api.example.com/v1/songs?cursor=abc>; rel="next""#,
    ///     "cursor",
    /// );
    /// assert_eq!(info.next_cursor.as_deref(), Some("abc"));
    /// assert!(info.prev_cursor.is_none());
    /// ```
    #[must_use]
    pub fn parse_link_header(header_value: &str, param: &str) -> Self {
        let mut result = Self::default();

        for link in header_value.split(',') {
            let link = link.trim();

            let rel = link.split(';').find_map(|part| {
                let part = part.trim();
                part.strip_prefix("rel=").map(|rel| rel.trim_matches('"'))
            });

            let url = link
                .split(';')
                .next()
                .map(|s| s.trim().trim_start_matches('<').trim_end_matches('>'));

            if let (Some(rel), Some(url)) = (rel, url) {
                if let Some(cursor) = Self::extract_param(url, param) {
                    match rel {
                        "previous" | "prev" => result.prev_cursor = Some(cursor),
                        "next" => result.next_cursor = Some(cursor),
                        _ => {}
                    }
                }
            }
        }

        result
    }

    fn extract_param(url: &str, param: &str) -> Option<String> {
        let (_, query) = url.split_once('?')?;

        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == param {
                Some(
                    urlencoding::decode(value)
                        .map_or_else(|_| value.to_string(), |v| v.into_owned()),
                )
            } else {
                None
            }
        })
    }
}

/// A response received from the API.
///
/// Header names are lowercased; a header may carry several values.
/// The body has already been decoded by the transport's codec.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The decoded response body.
    pub body: serde_json::Value,
    /// Seconds to wait before retrying (from the `Retry-After` header).
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing `Retry-After`.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let retry_request_after = headers
            .get("retry-after")
            .and_then(|values| values.first())
            .and_then(|value| value.parse::<f64>().ok());

        Self {
            code,
            headers,
            body,
            retry_request_after,
        }
    }

    /// Creates a header-less response, mostly useful with
    /// [`MockTransport`](crate::clients::MockTransport).
    #[must_use]
    pub fn with_body(code: u16, body: serde_json::Value) -> Self {
        Self::new(code, HashMap::new(), body)
    }

    /// Adds a header value, returning the response.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_lowercase();
        let value = value.into();
        if name == "retry-after" {
            self.retry_request_after = value.parse::<f64>().ok();
        }
        self.headers.entry(name).or_default().push(value);
        self
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns `true` for statuses worth retrying (429 and 5xx).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code == 429 || self.code >= 500
    }

    /// Returns the first value of a header, if present.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header_value("x-request-id")
    }

    /// Parses the `Link` header for a cursor carried in `param`.
    #[must_use]
    pub fn pagination(&self, param: &str) -> PaginationInfo {
        self.header_value("link")
            .map(|link| PaginationInfo::parse_link_header(link, param))
            .unwrap_or_default()
    }

    /// Serializes the error fields of the body into a JSON message.
    #[must_use]
    pub fn serialize_error(&self) -> String {
        let mut error_body = serde_json::Map::new();

        for key in ["errors", "error", "description", "message"] {
            if let Some(value) = self.body.get(key) {
                error_body.insert(key.to_string(), value.clone());
            }
        }

        if let Some(request_id) = self.request_id() {
            error_body.insert(
                "error_reference".to_string(),
                serde_json::json!(format!(
                    "If you report this error, please include this id: {request_id}."
                )),
            );
        }

        serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_ok_for_2xx() {
        assert!(HttpResponse::with_body(200, json!({})).is_ok());
        assert!(HttpResponse::with_body(204, json!({})).is_ok());
        assert!(!HttpResponse::with_body(301, json!({})).is_ok());
        assert!(!HttpResponse::with_body(404, json!({})).is_ok());
    }

    #[test]
    fn test_is_retryable() {
        assert!(HttpResponse::with_body(429, json!({})).is_retryable());
        assert!(HttpResponse::with_body(500, json!({})).is_retryable());
        assert!(HttpResponse::with_body(503, json!({})).is_retryable());
        assert!(!HttpResponse::with_body(404, json!({})).is_retryable());
    }

    #[test]
    fn test_retry_after_is_parsed() {
        let response = HttpResponse::with_body(429, json!({})).header("Retry-After", "2.5");
        assert_eq!(response.retry_request_after, Some(2.5));
    }

    #[test]
    fn test_request_id_lookup_is_case_insensitive() {
        let response = HttpResponse::with_body(200, json!({})).header("X-Request-Id", "req-1");
        assert_eq!(response.request_id(), Some("req-1"));
    }

    #[test]
    fn test_parse_link_header_next_and_previous() {
        let header = r#"<https://api.example.com/v1/songs?limit=2&page_info=prev123>; rel="previous", <https://api.example.com/v1/songs?limit=2&page_info=next456>; rel="next""#;
        let info = PaginationInfo::parse_link_header(header, "page_info");

        assert_eq!(info.prev_cursor.as_deref(), Some("prev123"));
        assert_eq!(info.next_cursor.as_deref(), Some("next456"));
    }

    #[test]
    fn test_parse_link_header_ignores_other_params() {
        let header = r#"<https://api.example.com/v1/songs?limit=2>; rel="next""#;
        let info = PaginationInfo::parse_link_header(header, "page_info");
        assert_eq!(info, PaginationInfo::default());
    }

    #[test]
    fn test_pagination_from_response() {
        let response = HttpResponse::with_body(200, json!([]))
            .header("Link", r#"<https://x.io/v1/songs?cursor=a%20b>; rel="next""#);
        assert_eq!(
            response.pagination("cursor").next_cursor.as_deref(),
            Some("a b")
        );
    }

    #[test]
    fn test_serialize_error_includes_request_id() {
        let response = HttpResponse::with_body(503, json!({"error": "Unavailable", "other": 1}))
            .header("X-Request-Id", "abc-123");
        let message = response.serialize_error();

        assert!(message.contains("Unavailable"));
        assert!(message.contains("abc-123"));
        assert!(!message.contains("other"));
    }
}
