//! Dynamic resource instances.
//!
//! A [`Resource`] is a field map bound to a [`ResourceType`], with a URI once
//! its identity is known and a dirty set of fields assigned since the last
//! load or save.
//!
//! # Persistence
//!
//! - [`save`](Resource::save) without a URI creates the resource: a POST of
//!   the declared fields to the collection. The URI is taken from the
//!   response (`uri` field or `Location` header) or resolved from the
//!   returned identifier.
//! - [`save`](Resource::save) with a URI sends only the dirty fields (PUT by
//!   default, PATCH if the type says so).
//! - Every operation leaves the instance untouched when it fails: the dirty
//!   set is only cleared after a successful response.
//!
//! # Example
//!
//! ```rust,ignore
//! let playlist = client.find("playlist", "p1", None).await?;
//!
//! let mut song = client.new_resource("song")?.with_parent(&playlist)?;
//! song.set("name", "Flutes");
//! song.set("length", 1234);
//! song.save(&client).await?; // POST /v1/playlists/p1/songs
//!
//! song.set("length", 1235);
//! song.save(&client).await?; // PUT /v1/playlists/p1/songs/s9 {"length": 1235}
//!
//! let songs = playlist.related(&client, "songs")?.all().await?;
//! ```

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::clients::{HttpError, HttpRequest, HttpResponse, RestClient};
use crate::rest::errors::ResourceError;
use crate::rest::path::{ParentRef, ResourceOperation};
use crate::rest::query::Query;
use crate::rest::registry::RegistryError;
use crate::rest::schema::ResourceType;
use crate::rest::tracking::FieldTracker;
use crate::rest::value::{Decoder, FieldValue};

/// A resource instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    resource_type: Arc<ResourceType>,
    fields: FieldTracker,
    uri: Option<String>,
    parent: Option<ParentRef>,
}

impl Resource {
    /// Creates an unsaved instance with no fields and no URI.
    #[must_use]
    pub fn new(resource_type: Arc<ResourceType>) -> Self {
        Self {
            resource_type,
            fields: FieldTracker::new(),
            uri: None,
            parent: None,
        }
    }

    /// Decodes a payload, dispatching on its type discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPayload`] if the payload has no
    /// discriminator, [`ResourceError::Registry`] if it is not registered,
    /// and [`ResourceError::InvalidField`] if a declared field cannot be
    /// coerced.
    pub fn from_payload(client: &RestClient, data: Value) -> Result<Self, ResourceError> {
        let decoder = client.decoder();
        let type_name = data
            .get(&client.page_format().type_field)
            .and_then(Value::as_str)
            .ok_or_else(|| ResourceError::InvalidPayload {
                resource: "resource".to_string(),
                reason: format!(
                    "payload has no '{}' discriminator",
                    client.page_format().type_field
                ),
            })?;
        let resource_type = client.registry().lookup(type_name)?;
        Self::decode(&decoder, resource_type, None, data)
    }

    /// Decodes a payload as the registered type `type_name`, for APIs whose
    /// payloads carry no discriminator. A discriminator present in `data`
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Registry`] if `type_name` is not registered,
    /// [`ResourceError::InvalidPayload`] if `data` is not an object, and
    /// [`ResourceError::InvalidField`] if a declared field cannot be coerced.
    pub fn from_payload_as(
        client: &RestClient,
        type_name: &str,
        data: Value,
    ) -> Result<Self, ResourceError> {
        let resource_type = client.registry().lookup(type_name)?;
        Self::decode(&client.decoder(), resource_type, None, data)
    }

    /// Decodes a payload as `resource_type`.
    pub(crate) fn decode(
        decoder: &Decoder<'_>,
        resource_type: Arc<ResourceType>,
        parent: Option<ParentRef>,
        data: Value,
    ) -> Result<Self, ResourceError> {
        let (fields, uri) = decode_fields(decoder, &resource_type, data)?;
        let mut resource = Self {
            resource_type,
            fields: FieldTracker::from_values(fields),
            uri: None,
            parent,
        };
        resource.uri = match uri {
            Some(uri) => Some(uri),
            None => resource.member_uri(resource.id().as_deref()).ok(),
        };
        Ok(resource)
    }

    /// Returns the resource type.
    #[must_use]
    pub const fn resource_type(&self) -> &Arc<ResourceType> {
        &self.resource_type
    }

    /// Returns the type discriminator.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.resource_type.name()
    }

    /// Returns the URI, once identity is known.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns the identifier field rendered as a string.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.fields
            .get(self.resource_type.id_field())
            .and_then(FieldValue::as_identifier)
    }

    /// Returns the parent this instance is nested under, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    /// Nests this instance under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] if this type is not nested
    /// under the parent's type, or the parent has no URI yet.
    pub fn with_parent(mut self, parent: &Self) -> Result<Self, ResourceError> {
        let parent_ref = parent.as_parent_ref(ResourceOperation::Create)?;
        if self.resource_type.parent_type() != Some(parent.type_name()) {
            return Err(ResourceError::UnresolvableUri {
                resource: self.type_name().to_string(),
                operation: ResourceOperation::Create.as_str(),
                reason: format!("{} is not nested under {}", self.type_name(), parent.type_name()),
            });
        }
        self.parent = Some(parent_ref);
        Ok(self)
    }

    pub(crate) fn with_parent_ref(mut self, parent: Option<ParentRef>) -> Self {
        self.parent = parent;
        self
    }

    pub(crate) fn or_uri(mut self, uri: &str) -> Self {
        if self.uri.is_none() {
            self.uri = Some(uri.to_string());
        }
        self
    }

    /// Returns a field's current value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Assigns a field and marks it dirty. Nothing is sent until
    /// [`save`](Self::save).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.set(name, value);
    }

    /// Returns `true` if fields were assigned since the last load or save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.fields.is_dirty()
    }

    /// Returns the dirty field names, sorted.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.dirty_fields()
    }

    /// Returns all fields, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.fields.iter()
    }

    /// Renders every field as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }

    /// Creates or updates the resource on the server.
    ///
    /// An instance without dirty fields and with a URI is not sent. Once the
    /// server accepts the write the dirty set is cleared, even if a returned
    /// field fails its declared coercion; such a field is kept uncoerced.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::UnresolvableUri`] if a nested type has no parent
    /// - [`ResourceError::ValidationFailed`] on 400/422
    /// - [`ResourceError::Conflict`] on 409
    /// - [`ResourceError::NotFound`] on 404
    /// - [`ResourceError::InvalidPayload`] if a create response identifies
    ///   no URI
    /// - [`ResourceError::Transport`] otherwise
    pub async fn save(&mut self, client: &RestClient) -> Result<(), ResourceError> {
        match self.uri.clone() {
            None => self.create(client).await,
            Some(uri) => self.update(client, &uri).await,
        }
    }

    async fn create(&mut self, client: &RestClient) -> Result<(), ResourceError> {
        let path = self.resource_type.uri_spec().resolve(
            self.type_name(),
            ResourceOperation::Create,
            None,
            self.parent.as_ref(),
        )?;

        let body: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .filter(|(name, _)| self.resource_type.is_declared(name))
            .filter_map(|(name, value)| value.to_body_json().map(|v| (name.to_string(), v)))
            .collect();

        let request = HttpRequest::builder(ResourceOperation::Create.default_http_method(), &path)
            .body(self.wrap(body))
            .build()
            .map_err(HttpError::from)?;
        let response = client.send(request).await?;
        self.check(&response, &path)?;

        let location = response.header_value("location").map(ToString::to_string);
        let payload = self.unwrap_envelope(response.body);
        let (fields, uri) = decode_write_response(&client.decoder(), &self.resource_type, payload);

        let mut created = self.clone();
        created.fields.merge(fields);
        let uri = match uri.or(location) {
            Some(uri) => uri,
            None => created
                .member_uri(created.id().as_deref())
                .map_err(|_| ResourceError::InvalidPayload {
                    resource: self.type_name().to_string(),
                    reason: "create response carried neither a URI nor an identifier".to_string(),
                })?,
        };

        tracing::debug!(resource = self.type_name(), uri = %uri, "created resource");
        created.uri = Some(uri);
        created.fields.mark_clean();
        *self = created;
        Ok(())
    }

    async fn update(&mut self, client: &RestClient, uri: &str) -> Result<(), ResourceError> {
        if !self.fields.is_dirty() {
            return Ok(());
        }

        let body: serde_json::Map<String, Value> = self
            .fields
            .changed_values()
            .filter_map(|(name, value)| value.to_body_json().map(|v| (name.to_string(), v)))
            .collect();

        let request = HttpRequest::builder(self.resource_type.update_method(), uri)
            .body(self.wrap(body))
            .build()
            .map_err(HttpError::from)?;
        let response = client.send(request).await?;
        self.check(&response, uri)?;

        let payload = self.unwrap_envelope(response.body);
        let (fields, returned_uri) =
            decode_write_response(&client.decoder(), &self.resource_type, payload);
        self.warn_on_uri_change(returned_uri.as_deref());

        self.fields.merge(fields);
        self.fields.mark_clean();
        Ok(())
    }

    /// Deletes the resource on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] for an unsaved instance,
    /// [`ResourceError::NotFound`] if the server no longer has it, and
    /// [`ResourceError::Transport`] for other failures.
    pub async fn delete(&self, client: &RestClient) -> Result<(), ResourceError> {
        let uri = self.require_uri(ResourceOperation::Delete)?;
        let request = HttpRequest::builder(ResourceOperation::Delete.default_http_method(), uri)
            .build()
            .map_err(HttpError::from)?;
        let response = client.send(request).await?;
        self.check(&response, uri)?;
        tracing::debug!(resource = self.type_name(), uri = %uri, "deleted resource");
        Ok(())
    }

    /// Re-reads every field from the server and clears the dirty set.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] for an unsaved instance,
    /// [`ResourceError::NotFound`] if the server no longer has it, and
    /// [`ResourceError::Transport`] for other failures.
    pub async fn refresh(&mut self, client: &RestClient) -> Result<(), ResourceError> {
        let uri = self.require_uri(ResourceOperation::Find)?.to_string();
        let response = client.get(&uri, Vec::new()).await?;
        self.check(&response, &uri)?;

        let payload = self.unwrap_envelope(response.body);
        let (fields, returned_uri) = decode_fields(&client.decoder(), &self.resource_type, payload)?;
        self.warn_on_uri_change(returned_uri.as_deref());
        self.fields.replace(fields);
        Ok(())
    }

    /// Returns a query over a related child collection, e.g. a playlist's
    /// `songs`. Equivalent to querying the child type with this instance as
    /// parent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownRelation`] if the type declares no
    /// such relation and [`ResourceError::UnresolvableUri`] if this instance
    /// has no URI yet.
    pub fn related(&self, client: &RestClient, name: &str) -> Result<Query, ResourceError> {
        let relation = self.resource_type.relation(name).ok_or_else(|| {
            RegistryError::UnknownRelation {
                type_name: self.type_name().to_string(),
                relation: name.to_string(),
            }
        })?;
        let target = client.resource_type(&relation.target)?;
        let parent = self.as_parent_ref(ResourceOperation::All)?;
        Query::new(client.clone(), target, Some(parent))
    }

    /// Returns a reference usable as the parent of nested resources.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] if this instance has no URI yet.
    pub fn as_parent_ref(&self, operation: ResourceOperation) -> Result<ParentRef, ResourceError> {
        self.require_uri(operation)
            .map(|uri| ParentRef::new(self.type_name(), uri))
    }

    fn require_uri(&self, operation: ResourceOperation) -> Result<&str, ResourceError> {
        self.uri.as_deref().ok_or_else(|| ResourceError::UnresolvableUri {
            resource: self.type_name().to_string(),
            operation: operation.as_str(),
            reason: format!("this {} has not been saved", self.type_name()),
        })
    }

    fn member_uri(&self, id: Option<&str>) -> Result<String, ResourceError> {
        self.resource_type.uri_spec().resolve(
            self.type_name(),
            ResourceOperation::Find,
            id,
            self.parent.as_ref(),
        )
    }

    fn check(&self, response: &HttpResponse, uri: &str) -> Result<(), ResourceError> {
        ResourceError::ensure_success(response, self.type_name(), uri)
    }

    fn wrap(&self, body: serde_json::Map<String, Value>) -> Value {
        match self.resource_type.envelope() {
            Some(key) => {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(key.to_string(), Value::Object(body));
                Value::Object(wrapped)
            }
            None => Value::Object(body),
        }
    }

    fn unwrap_envelope(&self, body: Value) -> Value {
        unwrap_envelope(&self.resource_type, body)
    }

    fn warn_on_uri_change(&self, returned: Option<&str>) {
        if let (Some(current), Some(returned)) = (self.uri.as_deref(), returned) {
            if current != returned {
                tracing::warn!(
                    resource = self.type_name(),
                    uri = current,
                    returned_uri = returned,
                    "server returned a different URI; keeping the assigned one"
                );
            }
        }
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Strips the type's envelope key from a single-resource body, if present.
pub(crate) fn unwrap_envelope(resource_type: &ResourceType, body: Value) -> Value {
    match (resource_type.envelope(), body) {
        (Some(key), Value::Object(mut map)) if map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        (_, body) => body,
    }
}

/// Decodes the fields of a single-resource payload, returning them with the
/// URI found in the payload. A `null` body decodes to no fields.
fn decode_fields(
    decoder: &Decoder<'_>,
    resource_type: &ResourceType,
    data: Value,
) -> Result<(Vec<(String, FieldValue)>, Option<String>), ResourceError> {
    let mut map = match data {
        Value::Object(map) => map,
        Value::Null => return Ok((Vec::new(), None)),
        other => {
            return Err(ResourceError::InvalidPayload {
                resource: resource_type.name().to_string(),
                reason: format!("expected an object, got {other}"),
            });
        }
    };

    map.remove(&decoder.format.type_field);
    let uri = match map.remove(&decoder.format.uri_field) {
        Some(Value::String(uri)) if !uri.is_empty() => Some(uri),
        _ => None,
    };

    let fields = map
        .into_iter()
        .map(|(name, value)| {
            decoder
                .decode_field(resource_type.name(), &name, resource_type.field(&name), value)
                .map(|value| (name, value))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((fields, uri))
}

/// Decodes the body of a successful create or update. The write has already
/// been applied, so a field that fails its declared coercion is kept
/// uncoerced and a body of the wrong shape contributes no fields.
fn decode_write_response(
    decoder: &Decoder<'_>,
    resource_type: &ResourceType,
    data: Value,
) -> (Vec<(String, FieldValue)>, Option<String>) {
    let mut map = match data {
        Value::Object(map) => map,
        Value::Null => return (Vec::new(), None),
        other => {
            tracing::warn!(
                resource = resource_type.name(),
                "ignoring non-object write response: {other}"
            );
            return (Vec::new(), None);
        }
    };

    map.remove(&decoder.format.type_field);
    let uri = match map.remove(&decoder.format.uri_field) {
        Some(Value::String(uri)) if !uri.is_empty() => Some(uri),
        _ => None,
    };

    let fields = map
        .into_iter()
        .filter_map(|(name, value)| {
            let kind = resource_type.field(&name);
            match decoder.decode_field(resource_type.name(), &name, kind, value.clone()) {
                Ok(decoded) => Some((name, decoded)),
                Err(e) => {
                    tracing::warn!(
                        resource = resource_type.name(),
                        field = %name,
                        "keeping undecodable field from write response: {e}"
                    );
                    decoder
                        .decode_any(value)
                        .ok()
                        .map(|raw| (name, raw))
                }
            }
        })
        .collect();

    (fields, uri)
}

// Verify Resource is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resource>();
};
