//! # restmap
//!
//! A resource-mapping client for REST APIs: declare resource types once, then
//! query, create, update and delete them as dynamic objects, with the URI
//! scheme, filter encoding and pagination handled for you.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - A registry of resource types with deterministic URI resolution,
//!   including nesting under parent resources
//! - Dynamic resources with dirty tracking, so updates send only what changed
//! - Immutable, lazy, paged queries with filter and sort encoding
//! - Async HTTP command layer with retry logic and a scripted mock transport
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use restmap::clients::MockTransport;
//! use restmap::rest::{field, FieldKind, PageFormat, ResourceRegistry, ResourceType};
//! use restmap::RestClient;
//! use serde_json::json;
//!
//! let mut registry = ResourceRegistry::new();
//! registry
//!     .register(
//!         ResourceType::builder("playlist", "/v1/playlists/{id}")
//!             .field("tags", FieldKind::List)
//!             .field("created_at", FieldKind::DateTime)
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.push_json(200, json!({"items": [
//!     {"_type": "playlist", "uri": "/v1/playlists/p1", "id": "p1"},
//!     {"_type": "playlist", "uri": "/v1/playlists/p2", "id": "p2"},
//! ]}));
//!
//! let client =
//!     RestClient::with_transport(transport.clone(), registry, PageFormat::default()).unwrap();
//! let query = client
//!     .query("playlist")
//!     .unwrap()
//!     .filter(field("tags").contains("nuti"))
//!     .unwrap()
//!     .sort(field("created_at").desc())
//!     .unwrap();
//!
//! let playlists = tokio_test::block_on(query.all()).unwrap();
//!
//! assert_eq!(playlists.len(), 2);
//! assert_eq!(
//!     transport.requests()[0].uri(),
//!     "/v1/playlists?tags.contains=nuti&sort=-created_at"
//! );
//! ```
//!
//! ## Talking HTTP
//!
//! ```rust,ignore
//! use restmap::{BasicAuth, ClientConfig, RestClient, RootUrl};
//!
//! let config = ClientConfig::builder()
//!     .root_url(RootUrl::new("https://api.example.com")?)
//!     .client_agent("jukebox/1.0")
//!     .auth(BasicAuth::new("user", "secret")?)
//!     .max_tries(3)
//!     .build()?;
//!
//! let client = RestClient::new(&config, registry)?;
//! let playlist = client.find("playlist", "p1", None).await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Registries and configuration are passed explicitly
//! - **Fail-fast validation**: Types, templates and filters are checked when built
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Lazy**: Nothing is requested until a query is consumed or a resource saved

pub mod clients;
pub mod config;
pub mod error;
pub mod rest;

// Re-export public types at crate root for convenience
pub use config::{
    AfterResponseHook, BasicAuth, BeforeRequestHook, ClientConfig, ClientConfigBuilder,
    RequestHooks, RootUrl,
};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse,
    HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError, PaginationInfo,
    RestClient, Transport,
};

// Re-export the resource layer entry points
pub use rest::{Query, Resource, ResourceError, ResourceRegistry, ResourceType};
