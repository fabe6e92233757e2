//! The resource-mapping layer.
//!
//! This module maps REST collections and members onto dynamic resources:
//!
//! - **[`ResourceType`]**: a named schema with declared fields and a URI template
//! - **[`ResourceRegistry`]**: discriminator to type map, populated at startup
//! - **[`UriSpec`]**: deterministic URI resolution, including nesting under a parent
//! - **[`Resource`]**: a field map with dirty tracking and save, delete, refresh
//! - **[`Query`]**: an immutable, lazy, paged collection query
//! - **[`ResourceError`]**: semantic error types for resource operations
//!
//! # Example
//!
//! ```rust,ignore
//! use restmap::rest::{field, FieldKind, ResourceRegistry, ResourceType};
//! use restmap::{ClientConfig, RestClient, RootUrl};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register(
//!     ResourceType::builder("playlist", "/v1/playlists/{id}")
//!         .field("name", FieldKind::String)
//!         .field("tags", FieldKind::List)
//!         .field("created_at", FieldKind::DateTime)
//!         .relation("songs", "song")
//!         .build()?,
//! )?;
//! registry.register(
//!     ResourceType::builder("song", "/v1/songs/{id}")
//!         .nested_under("playlist")
//!         .field("name", FieldKind::String)
//!         .field("length", FieldKind::Integer)
//!         .build()?,
//! )?;
//!
//! let client = RestClient::new(&config, registry)?;
//!
//! // GET /v1/playlists?tags.contains=nuti&sort=-created_at
//! let playlists = client
//!     .query("playlist")?
//!     .filter(field("tags").contains("nuti"))?
//!     .sort(field("created_at").desc())?
//!     .all()
//!     .await?;
//!
//! // POST /v1/playlists/p1/songs
//! let mut song = client.new_resource("song")?.with_parent(&playlists[0])?;
//! song.set("name", "Flutes");
//! song.set("length", 1234);
//! song.save(&client).await?;
//!
//! // GET /v1/playlists/p1/songs
//! let songs = playlists[0].related(&client, "songs")?.all().await?;
//! ```

pub(crate) mod errors;
pub(crate) mod filter;
pub(crate) mod path;
pub(crate) mod query;
pub(crate) mod registry;
pub(crate) mod resource;
pub(crate) mod response;
pub(crate) mod schema;
pub(crate) mod tracking;
pub(crate) mod value;

// Public exports
pub use errors::ResourceError;
pub use filter::{encode_sorts, field, Direction, Field, FilterExpr, Operator, SortKey};
pub use path::{ParentRef, ResourceOperation, UriSpec};
pub use query::{Query, QueryIter};
pub use registry::{RegistryError, ResourceRegistry};
pub use resource::Resource;
pub use response::{CursorSource, Page, PageFormat};
pub use schema::{CountStrategy, FieldDef, FieldKind, Relation, ResourceType, ResourceTypeBuilder};
pub use tracking::FieldTracker;
pub use value::FieldValue;
