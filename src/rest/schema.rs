//! Resource type declarations.
//!
//! A [`ResourceType`] is the schema of one kind of resource: its type
//! discriminator, its URI template, its declared fields and relations, and
//! the per-type paging and counting conventions of the API. Types are built
//! once with [`ResourceType::builder`] and registered in a
//! [`ResourceRegistry`](crate::rest::ResourceRegistry).
//!
//! # Example
//!
//! ```rust
//! use restmap::rest::{CountStrategy, FieldKind, ResourceType};
//!
//! let playlist = ResourceType::builder("playlist", "/v1/playlists/{id}")
//!     .field("name", FieldKind::String)
//!     .field("tags", FieldKind::List)
//!     .field("created_at", FieldKind::DateTime)
//!     .relation("songs", "song")
//!     .count(CountStrategy::page_total())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(playlist.name(), "playlist");
//! assert!(playlist.validate_path("created_at").is_ok());
//! assert!(playlist.validate_path("rating").is_err());
//! ```

use std::collections::BTreeMap;

use crate::clients::HttpMethod;
use crate::rest::path::{ResourceOperation, UriSpec};
use crate::rest::registry::RegistryError;

/// The declared kind of a field, driving payload coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Any JSON value, kept as decoded.
    Any,
    /// A string.
    String,
    /// A signed integer.
    Integer,
    /// A floating point number (integers are widened).
    Float,
    /// A boolean.
    Bool,
    /// An RFC 3339 timestamp, decoded to `DateTime<Utc>`.
    DateTime,
    /// A list of values.
    List,
    /// A nested object. Its sub-fields may be filtered on.
    Object,
}

impl FieldKind {
    /// Returns `true` if dotted sub-paths below a field of this kind are valid.
    #[must_use]
    pub const fn has_sub_fields(&self) -> bool {
        matches!(self, Self::Any | Self::Object)
    }

    /// Returns the kind name used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::List => "list",
            Self::Object => "object",
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// The field name as it appears in payloads.
    pub name: String,
    /// The field kind.
    pub kind: FieldKind,
}

/// A named relation to a child type nested under this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// The accessor name (e.g. `songs`).
    pub name: String,
    /// The child type discriminator (e.g. `song`).
    pub target: String,
}

/// How `.count()` obtains a count from the API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountStrategy {
    /// The API offers no count; `.count()` fails with `Unsupported`.
    #[default]
    Unsupported,
    /// GET `<collection>/<suffix>` with the query's filters and read `field`.
    Endpoint {
        /// The path segment appended to the collection URI.
        suffix: String,
        /// The body field holding the count.
        field: String,
    },
    /// GET one item of the filtered collection and read `field` from the page.
    PageTotal {
        /// The page body field holding the total.
        field: String,
    },
}

impl CountStrategy {
    /// `GET <collection>/count` answering `{"count": n}`.
    #[must_use]
    pub fn endpoint() -> Self {
        Self::Endpoint {
            suffix: "count".to_string(),
            field: "count".to_string(),
        }
    }

    /// Pages carrying `{"total": n}`.
    #[must_use]
    pub fn page_total() -> Self {
        Self::PageTotal {
            field: "total".to_string(),
        }
    }
}

/// The schema of one kind of resource. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    name: String,
    uri: UriSpec,
    fields: BTreeMap<String, FieldKind>,
    relations: Vec<Relation>,
    id_field: String,
    page_size: Option<u32>,
    count: CountStrategy,
    envelope: Option<String>,
    update_method: HttpMethod,
}

impl ResourceType {
    /// Creates a builder for a type with the given discriminator and member
    /// URI template (e.g. `/v1/songs/{id}`).
    #[must_use]
    pub fn builder(name: impl Into<String>, uri_template: impl Into<String>) -> ResourceTypeBuilder {
        ResourceTypeBuilder::new(name.into(), uri_template.into())
    }

    /// Returns the type discriminator.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the URI template.
    #[must_use]
    pub const fn uri_spec(&self) -> &UriSpec {
        &self.uri
    }

    /// Returns the parent type this type is nested under, if any.
    #[must_use]
    pub fn parent_type(&self) -> Option<&str> {
        self.uri.parent_type()
    }

    /// Returns the declared kind of a top-level field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }

    /// Returns `true` if the field is declared.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns all declared fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = FieldDef> + '_ {
        self.fields.iter().map(|(name, kind)| FieldDef {
            name: name.clone(),
            kind: *kind,
        })
    }

    /// Returns a relation by accessor name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Returns all relations.
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Returns the identifier field (default `id`).
    #[must_use]
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Returns the default page size, if declared.
    #[must_use]
    pub const fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Returns the count strategy.
    #[must_use]
    pub const fn count_strategy(&self) -> &CountStrategy {
        &self.count
    }

    /// Returns the key wrapping single-resource bodies, if the API uses one.
    #[must_use]
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Returns the method used for partial updates (default PUT).
    #[must_use]
    pub const fn update_method(&self) -> HttpMethod {
        self.update_method
    }

    /// Validates a dotted field path against the declared fields.
    ///
    /// The first segment must be declared. Deeper segments are accepted only
    /// below fields of kind [`FieldKind::Object`] or [`FieldKind::Any`].
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the path is invalid.
    pub fn validate_path(&self, path: &str) -> Result<(), String> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        if head.is_empty() {
            return Err("field path is empty".to_string());
        }
        let Some(kind) = self.field(head) else {
            return Err(format!("{head} is not a declared field of {}", self.name));
        };

        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return Ok(());
        }
        if rest.iter().any(|s| s.is_empty()) {
            return Err(format!("{path} has an empty segment"));
        }
        if !kind.has_sub_fields() {
            return Err(format!(
                "{head} is a {} field and has no sub-fields",
                kind.as_str()
            ));
        }
        Ok(())
    }
}

/// Builder for [`ResourceType`].
#[derive(Debug)]
pub struct ResourceTypeBuilder {
    name: String,
    uri_template: String,
    parent: Option<String>,
    fields: Vec<(String, FieldKind)>,
    relations: Vec<Relation>,
    id_field: Option<String>,
    page_size: Option<u32>,
    count: CountStrategy,
    envelope: Option<String>,
    update_method: HttpMethod,
}

impl ResourceTypeBuilder {
    fn new(name: String, uri_template: String) -> Self {
        Self {
            name,
            uri_template,
            parent: None,
            fields: Vec::new(),
            relations: Vec::new(),
            id_field: None,
            page_size: None,
            count: CountStrategy::default(),
            envelope: None,
            update_method: ResourceOperation::Update.default_http_method(),
        }
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    /// Nests this type's collection under members of `parent_type`.
    #[must_use]
    pub fn nested_under(mut self, parent_type: impl Into<String>) -> Self {
        self.parent = Some(parent_type.into());
        self
    }

    /// Declares a relation accessor to a child type nested under this one.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(Relation {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Sets the identifier field (default `id`).
    #[must_use]
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = Some(name.into());
        self
    }

    /// Sets the default page size sent with list requests.
    #[must_use]
    pub const fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sets the count strategy.
    #[must_use]
    pub fn count(mut self, strategy: CountStrategy) -> Self {
        self.count = strategy;
        self
    }

    /// Wraps single-resource request and response bodies under `key`.
    #[must_use]
    pub fn envelope(mut self, key: impl Into<String>) -> Self {
        self.envelope = Some(key.into());
        self
    }

    /// Sets the method used for partial updates.
    #[must_use]
    pub const fn update_method(mut self, method: HttpMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Builds the [`ResourceType`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUriTemplate`] for a malformed template
    /// and [`RegistryError::InvalidSchema`] for an empty name, a field
    /// declared twice with different kinds, a duplicate relation, a zero
    /// page size or an update method other than PUT or PATCH.
    pub fn build(self) -> Result<ResourceType, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidSchema {
            type_name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("type name is empty".to_string()));
        }

        let mut uri = UriSpec::parse(&self.uri_template)?;
        if let Some(parent) = &self.parent {
            uri = uri.nested_under(parent.clone());
        }

        let id_field = self.id_field.clone().unwrap_or_else(|| "id".to_string());

        let mut fields = BTreeMap::new();
        fields.insert(id_field.clone(), FieldKind::Any);
        for (name, kind) in &self.fields {
            if name.is_empty() || name.contains('.') {
                return Err(invalid(format!("invalid field name '{name}'")));
            }
            match fields.insert(name.clone(), *kind) {
                Some(previous) if previous != *kind && name != &id_field => {
                    return Err(invalid(format!("field {name} declared twice")));
                }
                _ => {}
            }
        }

        for (i, relation) in self.relations.iter().enumerate() {
            if self.relations[..i].iter().any(|r| r.name == relation.name) {
                return Err(invalid(format!("relation {} declared twice", relation.name)));
            }
        }

        if self.page_size == Some(0) {
            return Err(invalid("page size must be positive".to_string()));
        }

        if !matches!(self.update_method, HttpMethod::Put | HttpMethod::Patch) {
            return Err(invalid(format!(
                "{} cannot be used for updates",
                self.update_method
            )));
        }

        Ok(ResourceType {
            name: self.name,
            uri,
            fields,
            relations: self.relations,
            id_field,
            page_size: self.page_size,
            count: self.count,
            envelope: self.envelope,
            update_method: self.update_method,
        })
    }
}
