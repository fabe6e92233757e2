//! REST client binding a transport to a resource registry.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, Transport,
};
use crate::config::ClientConfig;
use crate::rest::errors::ResourceError;
use crate::rest::path::ResourceOperation;
use crate::rest::query::Query;
use crate::rest::registry::{RegistryError, ResourceRegistry};
use crate::rest::resource::{unwrap_envelope, Resource};
use crate::rest::response::PageFormat;
use crate::rest::schema::ResourceType;
use crate::rest::value::Decoder;

/// REST client for resource-mapped APIs.
///
/// Binds a [`Transport`] to a [`ResourceRegistry`] and the page decoding
/// conventions of one API. It offers raw verbs (`get`, `post`, `put`,
/// `patch`, `delete`) plus the entry points of the resource layer:
/// [`query`](Self::query), [`new_resource`](Self::new_resource),
/// [`find`](Self::find) and [`fetch`](Self::fetch).
///
/// Cloning is cheap; clones share the transport and the registry.
///
/// # Retries
///
/// GET requests are sent with the configured `max_tries`. Writes are always
/// sent once.
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use restmap::{ClientConfig, RestClient, RootUrl};
/// use restmap::rest::{ResourceRegistry, ResourceType, FieldKind};
///
/// let mut registry = ResourceRegistry::new();
/// registry.register(
///     ResourceType::builder("playlist", "/v1/playlists/{id}")
///         .field("name", FieldKind::String)
///         .build()?,
/// )?;
///
/// let config = ClientConfig::builder()
///     .root_url(RootUrl::new("https://api.example.com")?)
///     .build()?;
/// let client = RestClient::new(&config, registry)?;
///
/// let playlist = client.find("playlist", "p1", None).await?;
/// ```
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
    registry: Arc<ResourceRegistry>,
    page_format: Arc<PageFormat>,
    read_tries: u32,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("registry", &self.registry.type_names())
            .field("page_format", &self.page_format)
            .field("read_tries", &self.read_tries)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client that talks HTTP through an [`HttpClient`].
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Registry`] if the registry references
    /// unregistered types, and [`ResourceError::Transport`] if the HTTP
    /// client cannot be built from `config`.
    pub fn new(config: &ClientConfig, registry: ResourceRegistry) -> Result<Self, ResourceError> {
        registry.validate()?;
        let http_client = HttpClient::new(config)?;

        tracing::debug!(
            root_url = config.root_url().as_ref(),
            types = registry.len(),
            "created REST client"
        );

        Ok(Self {
            transport: Arc::new(http_client),
            registry: Arc::new(registry),
            page_format: Arc::new(config.page_format().clone()),
            read_tries: config.max_tries(),
        })
    }

    /// Creates a client over any [`Transport`], such as a
    /// [`MockTransport`](crate::clients::MockTransport).
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the registry references unregistered
    /// types.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        registry: ResourceRegistry,
        page_format: PageFormat,
    ) -> Result<Self, RegistryError> {
        registry.validate()?;
        Ok(Self {
            transport,
            registry: Arc::new(registry),
            page_format: Arc::new(page_format),
            read_tries: 1,
        })
    }

    /// Returns a client sending GET requests up to `tries` times.
    #[must_use]
    pub fn with_read_tries(mut self, tries: u32) -> Self {
        self.read_tries = tries.max(1);
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Returns the page decoding conventions.
    #[must_use]
    pub fn page_format(&self) -> &PageFormat {
        &self.page_format
    }

    /// Looks up a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResourceType`] if nothing is
    /// registered under `type_name`.
    pub fn resource_type(&self, type_name: &str) -> Result<Arc<ResourceType>, RegistryError> {
        self.registry.lookup(type_name)
    }

    pub(crate) fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.registry, &self.page_format)
    }

    /// Starts a query over a top-level collection.
    ///
    /// Nested collections are queried through
    /// [`Resource::related`] or [`Query::new`] with a parent.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Registry`] for an unknown type and
    /// [`ResourceError::UnresolvableUri`] for a nested one.
    pub fn query(&self, type_name: &str) -> Result<Query, ResourceError> {
        let resource_type = self.resource_type(type_name)?;
        Query::new(self.clone(), resource_type, None)
    }

    /// Creates an unsaved resource of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Registry`] for an unknown type.
    pub fn new_resource(&self, type_name: &str) -> Result<Resource, ResourceError> {
        Ok(Resource::new(self.resource_type(type_name)?))
    }

    /// Fetches a resource by identifier, nested under `parent` if its type
    /// requires one.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] if the member path cannot
    /// be resolved, [`ResourceError::NotFound`] on 404 and
    /// [`ResourceError::Transport`] for other failures.
    pub async fn find(
        &self,
        type_name: &str,
        id: &str,
        parent: Option<&Resource>,
    ) -> Result<Resource, ResourceError> {
        let resource_type = self.resource_type(type_name)?;
        let parent = parent
            .map(|p| p.as_parent_ref(ResourceOperation::Find))
            .transpose()?;
        let uri = resource_type.uri_spec().resolve(
            type_name,
            ResourceOperation::Find,
            Some(id),
            parent.as_ref(),
        )?;

        let response = self.get(&uri, Vec::new()).await?;
        ResourceError::ensure_success(&response, type_name, &uri)?;

        let payload = unwrap_envelope(&resource_type, response.body);
        Ok(Resource::decode(&self.decoder(), resource_type, parent, payload)?.or_uri(&uri))
    }

    /// Fetches any resource by URI.
    ///
    /// The type is taken from the payload discriminator, or else from the
    /// registered URI template the path matches.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPayload`] if the type cannot be
    /// determined, [`ResourceError::NotFound`] on 404 and
    /// [`ResourceError::Transport`] for other failures.
    pub async fn fetch(&self, uri: &str) -> Result<Resource, ResourceError> {
        let response = self.get(uri, Vec::new()).await?;
        ResourceError::ensure_success(&response, "resource", uri)?;

        let discriminator = response
            .body
            .get(&self.page_format.type_field)
            .and_then(Value::as_str);
        let matched = self.registry.match_member_uri(uri);

        let (resource_type, parent) = match (discriminator, matched) {
            (Some(name), matched) => {
                let resource_type = self.resource_type(name)?;
                let parent = matched
                    .filter(|(t, _)| t.name() == resource_type.name())
                    .and_then(|(_, parent)| parent);
                (resource_type, parent)
            }
            (None, Some(matched)) => matched,
            (None, None) => {
                return Err(ResourceError::InvalidPayload {
                    resource: "resource".to_string(),
                    reason: format!(
                        "{uri} matches no registered type and the payload has no '{}'",
                        self.page_format.type_field
                    ),
                });
            }
        };

        let payload = unwrap_envelope(&resource_type, response.body);
        Ok(Resource::decode(&self.decoder(), resource_type, parent, payload)?.or_uri(uri))
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures. Non-2xx responses are
    /// returned as `Ok`.
    pub async fn get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Get, path)
            .query(query)
            .tries(self.read_tries)
            .build()?;
        self.send(request).await
    }

    /// Sends a POST request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures.
    pub async fn post(&self, path: &str, body: Value) -> Result<HttpResponse, HttpError> {
        self.write(HttpMethod::Post, path, body).await
    }

    /// Sends a PUT request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures.
    pub async fn put(&self, path: &str, body: Value) -> Result<HttpResponse, HttpError> {
        self.write(HttpMethod::Put, path, body).await
    }

    /// Sends a PATCH request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures.
    pub async fn patch(&self, path: &str, body: Value) -> Result<HttpResponse, HttpError> {
        self.write(HttpMethod::Patch, path, body).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures.
    pub async fn delete(&self, path: &str) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Delete, path).build()?;
        self.send(request).await
    }

    /// Sends a prepared request through the transport.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for transport failures.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.transport.request(request).await
    }

    async fn write(
        &self,
        method: HttpMethod,
        path: &str,
        body: Value,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(method, path).body(body).build()?;
        self.send(request).await
    }
}
