//! Field values and payload coercion.
//!
//! Resource fields hold [`FieldValue`]s: decoded JSON plus timestamps and
//! embedded resources. Payloads are decoded in two steps: a generic decode
//! that turns objects carrying a registered type discriminator into nested
//! [`Resource`]s, then [`FieldKind::coerce`] for declared fields.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::rest::errors::ResourceError;
use crate::rest::registry::ResourceRegistry;
use crate::rest::resource::Resource;
use crate::rest::response::PageFormat;
use crate::rest::schema::FieldKind;

/// A field value of a [`Resource`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A timestamp (declared `DateTime` fields).
    DateTime(DateTime<Utc>),
    /// A list.
    List(Vec<FieldValue>),
    /// An object without a registered discriminator.
    Object(BTreeMap<String, FieldValue>),
    /// An embedded resource.
    Resource(Box<Resource>),
}

impl FieldValue {
    /// Converts plain JSON without resource detection.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Integer),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back to JSON. Timestamps are rendered as RFC 3339 and
    /// embedded resources as their full field map.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Resource(resource) => resource.to_json(),
        }
    }

    /// Converts to JSON for a request body, leaving out embedded resources.
    #[must_use]
    pub(crate) fn to_body_json(&self) -> Option<Value> {
        match self {
            Self::Resource(_) => None,
            Self::List(items) => Some(Value::Array(
                items.iter().filter_map(Self::to_body_json).collect(),
            )),
            Self::Object(map) => Some(Value::Object(
                map.iter()
                    .filter_map(|(k, v)| v.to_body_json().map(|v| (k.clone(), v)))
                    .collect(),
            )),
            other => Some(other.to_json()),
        }
    }

    /// Renders the value as a query parameter operand.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::List(items) => items
                .iter()
                .map(Self::to_query_string)
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => self.to_json().to_string(),
            Self::Resource(resource) => resource
                .uri()
                .map_or_else(|| resource.to_json().to_string(), ToString::to_string),
        }
    }

    /// Returns `true` for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a timestamp.
    #[must_use]
    pub const fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object entries, if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the embedded resource, if this is one.
    #[must_use]
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Returns the value as an identifier string (strings and integers).
    #[must_use]
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            Self::String(s) if !s.is_empty() => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Resource> for FieldValue {
    fn from(value: Resource) -> Self {
        Self::Resource(Box::new(value))
    }
}

impl<T: Into<Self>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl FieldKind {
    /// Coerces a decoded value to this kind. `Null` is accepted for every kind.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch.
    ///
    /// # Example
    ///
    /// ```rust
    /// use restmap::rest::{FieldKind, FieldValue};
    ///
    /// let value = FieldKind::DateTime
    ///     .coerce(FieldValue::from("2024-05-01T10:00:00Z"))
    ///     .unwrap();
    /// assert!(value.as_datetime().is_some());
    ///
    /// assert!(FieldKind::Integer.coerce(FieldValue::from("ten")).is_err());
    /// ```
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue, String> {
        let mismatch = |value: &FieldValue| {
            format!("expected {}, got {}", self.as_str(), value.to_json())
        };

        match (self, value) {
            (_, FieldValue::Null) => Ok(FieldValue::Null),
            (Self::Any, value) => Ok(value),
            (Self::String, value @ FieldValue::String(_))
            | (Self::Integer, value @ FieldValue::Integer(_))
            | (Self::Float, value @ FieldValue::Float(_))
            | (Self::Bool, value @ FieldValue::Bool(_))
            | (Self::DateTime, value @ FieldValue::DateTime(_))
            | (Self::List, value @ FieldValue::List(_))
            | (Self::Object, value @ (FieldValue::Object(_) | FieldValue::Resource(_))) => {
                Ok(value)
            }
            (Self::Float, FieldValue::Integer(i)) => Ok(FieldValue::Float(i as f64)),
            (Self::Integer, FieldValue::Float(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 =>
            {
                Ok(FieldValue::Integer(f as i64))
            }
            (Self::DateTime, FieldValue::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| format!("invalid timestamp '{s}': {e}")),
            (_, value) => Err(mismatch(&value)),
        }
    }
}

/// Decodes payload values, turning objects with a registered discriminator
/// into embedded resources.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Decoder<'a> {
    pub(crate) registry: &'a ResourceRegistry,
    pub(crate) format: &'a PageFormat,
}

impl<'a> Decoder<'a> {
    pub(crate) const fn new(registry: &'a ResourceRegistry, format: &'a PageFormat) -> Self {
        Self { registry, format }
    }

    /// Generic decode with embedded resource detection.
    pub(crate) fn decode_any(&self, value: Value) -> Result<FieldValue, ResourceError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.decode_any(item))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List),
            Value::Object(map) => {
                let embedded_type = map
                    .get(&self.format.type_field)
                    .and_then(Value::as_str)
                    .and_then(|name| self.registry.lookup(name).ok());
                match embedded_type {
                    Some(resource_type) => {
                        Resource::decode(self, resource_type, None, Value::Object(map))
                            .map(FieldValue::from)
                    }
                    None => map
                        .into_iter()
                        .map(|(k, v)| self.decode_any(v).map(|v| (k, v)))
                        .collect::<Result<BTreeMap<_, _>, _>>()
                        .map(FieldValue::Object),
                }
            }
            other => Ok(FieldValue::from_json(other)),
        }
    }

    /// Decodes a field, applying the declared kind if there is one.
    pub(crate) fn decode_field(
        &self,
        resource: &str,
        field: &str,
        kind: Option<FieldKind>,
        value: Value,
    ) -> Result<FieldValue, ResourceError> {
        let decoded = self.decode_any(value)?;
        match kind {
            Some(kind) => kind.coerce(decoded).map_err(|reason| ResourceError::InvalidField {
                resource: resource.to_string(),
                field: field.to_string(),
                reason,
            }),
            None => Ok(decoded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_from_json_and_back() {
        let value = json!({"a": [1, 2.5, "x", true, null], "b": {"c": "d"}});
        assert_eq!(FieldValue::from_json(value.clone()).to_json(), value);
    }

    #[test]
    fn test_coerce_datetime() {
        let value = FieldKind::DateTime
            .coerce(FieldValue::from("2024-05-01T10:00:00+02:00"))
            .unwrap();
        assert_eq!(
            value,
            FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(value.to_json(), json!("2024-05-01T08:00:00Z"));
    }

    #[test]
    fn test_coerce_rejects_invalid_timestamp() {
        let error = FieldKind::DateTime
            .coerce(FieldValue::from("yesterday"))
            .unwrap_err();
        assert!(error.contains("yesterday"));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(
            FieldKind::Float.coerce(FieldValue::Integer(3)).unwrap(),
            FieldValue::Float(3.0)
        );
        assert_eq!(
            FieldKind::Integer.coerce(FieldValue::Float(4.0)).unwrap(),
            FieldValue::Integer(4)
        );
        assert!(FieldKind::Integer.coerce(FieldValue::Float(4.5)).is_err());
    }

    #[test]
    fn test_coerce_accepts_null_and_any() {
        assert_eq!(
            FieldKind::String.coerce(FieldValue::Null).unwrap(),
            FieldValue::Null
        );
        assert_eq!(
            FieldKind::Any.coerce(FieldValue::Integer(1)).unwrap(),
            FieldValue::Integer(1)
        );
        assert!(FieldKind::Bool.coerce(FieldValue::from("yes")).is_err());
    }

    #[test]
    fn test_query_string_rendering() {
        assert_eq!(FieldValue::from("nuti").to_query_string(), "nuti");
        assert_eq!(FieldValue::from(42).to_query_string(), "42");
        assert_eq!(FieldValue::from(true).to_query_string(), "true");
        assert_eq!(
            FieldValue::from(vec!["a", "b"]).to_query_string(),
            "a,b"
        );
    }

    #[test]
    fn test_identifier_rendering() {
        assert_eq!(FieldValue::from("s1").as_identifier().as_deref(), Some("s1"));
        assert_eq!(FieldValue::from(9).as_identifier().as_deref(), Some("9"));
        assert_eq!(FieldValue::Null.as_identifier(), None);
        assert_eq!(FieldValue::from("").as_identifier(), None);
    }

    #[test]
    fn test_serialize_matches_json_rendering() {
        let value = FieldValue::List(vec![
            FieldValue::from("a"),
            FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"["a","2024-05-01T08:00:00Z"]"#
        );
    }
}
