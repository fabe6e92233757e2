//! Pluggable body serialization.
//!
//! A [`Codec`] turns request payloads into bytes and response bytes back into
//! [`serde_json::Value`] payloads. [`JsonCodec`] is used unless another codec
//! is given to [`HttpClient::with_codec`](crate::clients::HttpClient::with_codec).

use std::fmt;

use crate::clients::errors::CodecError;

/// Serialization collaborator for request and response bodies.
pub trait Codec: Send + Sync + fmt::Debug {
    /// The content type sent in `Content-Type` and `Accept` headers.
    fn content_type(&self) -> &str;

    /// Serializes a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload cannot be represented.
    fn serialize(&self, value: &serde_json::Value) -> Result<(String, Vec<u8>), CodecError>;

    /// Deserializes a response body. An empty body decodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the bytes are not a valid payload.
    fn deserialize(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<serde_json::Value, CodecError>;
}

/// JSON codec backed by `serde_json`.
///
/// # Example
///
/// ```rust
/// use restmap::clients::{Codec, JsonCodec};
/// use serde_json::json;
///
/// let codec = JsonCodec;
/// let (content_type, bytes) = codec.serialize(&json!({"name": "Flutes"})).unwrap();
/// assert_eq!(content_type, "application/json");
/// assert_eq!(codec.deserialize(Some("application/json"), &bytes).unwrap(), json!({"name": "Flutes"}));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec;

const JSON_CONTENT_TYPE: &str = "application/json";

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn serialize(&self, value: &serde_json::Value) -> Result<(String, Vec<u8>), CodecError> {
        serde_json::to_vec(value)
            .map(|bytes| (JSON_CONTENT_TYPE.to_string(), bytes))
            .map_err(|e| CodecError {
                action: "encode",
                content_type: JSON_CONTENT_TYPE.to_string(),
                message: e.to_string(),
            })
    }

    fn deserialize(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<serde_json::Value, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(bytes).map_err(|e| CodecError {
            action: "decode",
            content_type: content_type.unwrap_or(JSON_CONTENT_TYPE).to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_codec_serializes_with_content_type() {
        let (content_type, bytes) = JsonCodec.serialize(&json!({"length": 1234})).unwrap();
        assert_eq!(content_type, "application/json");
        assert_eq!(bytes, br#"{"length":1234}"#);
    }

    #[test]
    fn test_json_codec_empty_body_is_null() {
        assert_eq!(JsonCodec.deserialize(None, b"").unwrap(), serde_json::Value::Null);
        assert_eq!(JsonCodec.deserialize(None, b"  \n").unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_json_codec_rejects_invalid_body() {
        let error = JsonCodec
            .deserialize(Some("text/html"), b"<html>")
            .unwrap_err();
        assert_eq!(error.action, "decode");
        assert_eq!(error.content_type, "text/html");
    }
}
