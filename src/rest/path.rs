//! URI templates and path resolution.
//!
//! A resource type declares a member template such as `/v1/songs/{id}`. The
//! final segment is the identifier placeholder, the segment before it is the
//! collection name and everything before that is the root. A type may also
//! be nested under a parent type, in which case its collection lives below
//! the parent's member URI instead of below its own root.
//!
//! # Example
//!
//! ```rust
//! use restmap::rest::{ParentRef, ResourceOperation, UriSpec};
//!
//! let spec = UriSpec::parse("/v1/songs/{id}").unwrap().nested_under("playlist");
//! let parent = ParentRef::new("playlist", "/v1/playlists/p1");
//!
//! let path = spec
//!     .resolve("song", ResourceOperation::Find, Some("s1"), Some(&parent))
//!     .unwrap();
//! assert_eq!(path, "/v1/playlists/p1/songs/s1");
//! ```

use crate::clients::HttpMethod;
use crate::rest::errors::ResourceError;
use crate::rest::registry::RegistryError;

/// Operations that can be performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Find a single resource by ID (GET /resources/{id}).
    Find,
    /// List resources (GET /resources).
    All,
    /// Create a new resource (POST /resources).
    Create,
    /// Update an existing resource (PUT /resources/{id}).
    Update,
    /// Delete a resource (DELETE /resources/{id}).
    Delete,
    /// Count resources.
    Count,
}

impl ResourceOperation {
    /// Returns the default HTTP method for this operation.
    #[must_use]
    pub const fn default_http_method(&self) -> HttpMethod {
        match self {
            Self::Find | Self::All | Self::Count => HttpMethod::Get,
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    /// Returns the operation name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::All => "all",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Count => "count",
        }
    }

    /// Returns `true` if the operation targets a single member.
    #[must_use]
    pub const fn targets_member(&self) -> bool {
        matches!(self, Self::Find | Self::Update | Self::Delete)
    }
}

/// A reference to a parent resource: its type name and resolved URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    /// The parent's type discriminator.
    pub type_name: String,
    /// The parent's resolved member URI.
    pub uri: String,
}

impl ParentRef {
    /// Creates a new parent reference.
    #[must_use]
    pub fn new(type_name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            uri: uri.into(),
        }
    }
}

/// A parsed member URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriSpec {
    template: String,
    root: Vec<String>,
    collection: String,
    placeholder: String,
    parent: Option<String>,
}

impl UriSpec {
    /// Parses a member template of the form `/root/.../collection/{placeholder}`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUriTemplate`] if the template does not
    /// end in a placeholder preceded by a literal collection segment, or if a
    /// placeholder appears anywhere else.
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidUriTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = template.trim();
        if !trimmed.starts_with('/') {
            return Err(invalid("template must start with '/'"));
        }

        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, rest)) = segments.split_last() else {
            return Err(invalid("template has no segments"));
        };
        let Some((collection, root)) = rest.split_last() else {
            return Err(invalid("template needs a collection segment before the identifier"));
        };

        let placeholder = last
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .filter(|s| !s.is_empty() && !s.contains(['{', '}']))
            .ok_or_else(|| invalid("final segment must be an identifier placeholder"))?;

        if root
            .iter()
            .chain(std::iter::once(collection))
            .any(|s| s.contains(['{', '}']))
        {
            return Err(invalid("only the final segment may be a placeholder"));
        }

        Ok(Self {
            template: trimmed.to_string(),
            root: root.iter().map(ToString::to_string).collect(),
            collection: (*collection).to_string(),
            placeholder: placeholder.to_string(),
            parent: None,
        })
    }

    /// Nests the collection under members of `parent_type`.
    #[must_use]
    pub fn nested_under(mut self, parent_type: impl Into<String>) -> Self {
        self.parent = Some(parent_type.into());
        self
    }

    /// Returns the original template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the root segments preceding the collection.
    #[must_use]
    pub fn root(&self) -> &[String] {
        &self.root
    }

    /// Returns the collection segment.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the identifier placeholder name.
    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Returns the parent type this collection is nested under, if any.
    #[must_use]
    pub fn parent_type(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Resolves the path for an operation.
    ///
    /// Member operations (find, update, delete) require an identifier. Nested
    /// types require a parent of the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnresolvableUri`] if an identifier or parent
    /// is required but absent, or the parent has the wrong type.
    pub fn resolve(
        &self,
        resource: &str,
        operation: ResourceOperation,
        identifier: Option<&str>,
        parent: Option<&ParentRef>,
    ) -> Result<String, ResourceError> {
        let unresolvable = |reason: String| ResourceError::UnresolvableUri {
            resource: resource.to_string(),
            operation: operation.as_str(),
            reason,
        };

        let collection_path = match (&self.parent, parent) {
            (Some(expected), Some(parent)) if &parent.type_name == expected => {
                format!("{}/{}", parent.uri.trim_end_matches('/'), self.collection)
            }
            (Some(expected), Some(parent)) => {
                return Err(unresolvable(format!(
                    "expected a parent of type {expected}, got {}",
                    parent.type_name
                )));
            }
            (Some(expected), None) => {
                return Err(unresolvable(format!("a parent {expected} is required")));
            }
            (None, Some(parent)) => {
                return Err(unresolvable(format!(
                    "{resource} is not nested under {}",
                    parent.type_name
                )));
            }
            (None, None) => {
                let mut path = String::new();
                for segment in &self.root {
                    path.push('/');
                    path.push_str(segment);
                }
                path.push('/');
                path.push_str(&self.collection);
                path
            }
        };

        if !operation.targets_member() {
            return Ok(collection_path);
        }

        match identifier {
            Some(id) if !id.is_empty() => {
                Ok(format!("{collection_path}/{}", urlencoding::encode(id)))
            }
            _ => Err(unresolvable(format!(
                "an identifier for {{{}}} is required",
                self.placeholder
            ))),
        }
    }

    /// Splits a member path into (collection prefix, identifier) if its
    /// final segments match this template's collection.
    pub(crate) fn split_member<'a>(&self, segments: &'a [&'a str]) -> Option<(&'a [&'a str], &'a str)> {
        let (id, rest) = segments.split_last()?;
        let (collection, prefix) = rest.split_last()?;
        if *collection == self.collection && !id.is_empty() {
            Some((prefix, id))
        } else {
            None
        }
    }
}
