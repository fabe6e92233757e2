//! The resource registry.
//!
//! The registry maps type discriminators (the `_type` field of payloads, by
//! default) to [`ResourceType`]s. It is populated at startup and handed to a
//! [`RestClient`](crate::RestClient), which validates it and freezes it
//! behind an `Arc` for the rest of the process.
//!
//! # Example
//!
//! ```rust
//! use restmap::rest::{FieldKind, ResourceRegistry, ResourceType, RegistryError};
//!
//! let mut registry = ResourceRegistry::new();
//! registry
//!     .register(
//!         ResourceType::builder("playlist", "/v1/playlists/{id}")
//!             .field("name", FieldKind::String)
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.lookup("playlist").unwrap().name(), "playlist");
//! assert!(matches!(
//!     registry.lookup("album"),
//!     Err(RegistryError::UnknownResourceType { .. })
//! ));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::rest::path::ParentRef;
use crate::rest::schema::ResourceType;

/// Errors raised while declaring, registering or looking up resource types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A different type is already registered under this discriminator.
    #[error("A different resource type is already registered as '{type_name}'")]
    DuplicateRegistration {
        /// The contested discriminator.
        type_name: String,
    },

    /// No type is registered under this discriminator.
    #[error("Unknown resource type '{type_name}'")]
    UnknownResourceType {
        /// The unknown discriminator.
        type_name: String,
    },

    /// A URI template cannot be parsed.
    #[error("Invalid URI template '{template}': {reason}")]
    InvalidUriTemplate {
        /// The template that was provided.
        template: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A type is nested under a parent type that is not registered.
    #[error("Resource type '{type_name}' is nested under unknown type '{parent}'")]
    UnknownParentType {
        /// The nested type.
        type_name: String,
        /// The missing parent type.
        parent: String,
    },

    /// A relation points at a type that is not nested under its owner.
    #[error("Relation '{relation}' of '{type_name}' is invalid: {reason}")]
    InvalidRelation {
        /// The owning type.
        type_name: String,
        /// The relation accessor name.
        relation: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A type does not declare the requested relation.
    #[error("Resource type '{type_name}' has no relation '{relation}'")]
    UnknownRelation {
        /// The owning type.
        type_name: String,
        /// The requested relation.
        relation: String,
    },

    /// A type declaration is inconsistent.
    #[error("Invalid declaration of '{type_name}': {reason}")]
    InvalidSchema {
        /// The type being declared.
        type_name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Discriminator to [`ResourceType`] map.
///
/// Registering an identical declaration twice is a no-op; registering a
/// different declaration under an existing discriminator fails.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    types: HashMap<String, Arc<ResourceType>>,
}

// Verify ResourceRegistry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceRegistry>();
};

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type under its discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if a different type
    /// is already registered under the same discriminator.
    pub fn register(&mut self, resource_type: ResourceType) -> Result<Arc<ResourceType>, RegistryError> {
        if let Some(existing) = self.types.get(resource_type.name()) {
            if **existing == resource_type {
                return Ok(Arc::clone(existing));
            }
            return Err(RegistryError::DuplicateRegistration {
                type_name: resource_type.name().to_string(),
            });
        }

        tracing::debug!(
            resource = resource_type.name(),
            template = resource_type.uri_spec().template(),
            "registered resource type"
        );
        let resource_type = Arc::new(resource_type);
        self.types
            .insert(resource_type.name().to_string(), Arc::clone(&resource_type));
        Ok(resource_type)
    }

    /// Looks up a type by discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResourceType`] if nothing is registered
    /// under `type_name`.
    pub fn lookup(&self, type_name: &str) -> Result<Arc<ResourceType>, RegistryError> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownResourceType {
                type_name: type_name.to_string(),
            })
    }

    /// Returns `true` if a type is registered under `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the registered discriminators, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Checks cross-type references: every parent type is registered, and
    /// every relation targets a registered type nested under its owner.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownParentType`] or
    /// [`RegistryError::InvalidRelation`] for the first broken reference.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for name in self.type_names() {
            let resource_type = &self.types[name];

            if let Some(parent) = resource_type.parent_type() {
                if !self.contains(parent) {
                    return Err(RegistryError::UnknownParentType {
                        type_name: name.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }

            for relation in resource_type.relations() {
                let invalid = |reason: String| RegistryError::InvalidRelation {
                    type_name: name.to_string(),
                    relation: relation.name.clone(),
                    reason,
                };
                let target = self
                    .types
                    .get(&relation.target)
                    .ok_or_else(|| invalid(format!("{} is not registered", relation.target)))?;
                if target.parent_type() != Some(name) {
                    return Err(invalid(format!(
                        "{} is not nested under {name}",
                        relation.target
                    )));
                }
            }
        }
        Ok(())
    }

    /// Finds the type whose member template matches `uri`, along with the
    /// parent reference implied by the path for nested types.
    #[must_use]
    pub fn match_member_uri(&self, uri: &str) -> Option<(Arc<ResourceType>, Option<ParentRef>)> {
        let path = uri.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut names = self.type_names();
        // Nested templates are more specific than top-level ones.
        names.sort_by_key(|name| self.nesting_depth(name).map_or(usize::MAX, |d| usize::MAX - d));

        names.into_iter().find_map(|name| {
            let resource_type = &self.types[name];
            self.member_prefix_matches(resource_type, &segments, 0)
                .then(|| {
                    let parent = resource_type.parent_type().map(|parent| {
                        let prefix_len = segments.len() - 2;
                        ParentRef::new(parent, format!("/{}", segments[..prefix_len].join("/")))
                    });
                    (Arc::clone(resource_type), parent)
                })
        })
    }

    fn nesting_depth(&self, name: &str) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.types.get(name)?;
        while let Some(parent) = current.parent_type() {
            depth += 1;
            if depth > self.types.len() {
                return None;
            }
            current = self.types.get(parent)?;
        }
        Some(depth)
    }

    fn member_prefix_matches(&self, resource_type: &ResourceType, segments: &[&str], depth: usize) -> bool {
        if depth > self.types.len() {
            return false;
        }
        let Some((prefix, _id)) = resource_type.uri_spec().split_member(segments) else {
            return false;
        };
        match resource_type.parent_type() {
            Some(parent) => self
                .types
                .get(parent)
                .is_some_and(|parent| self.member_prefix_matches(parent, prefix, depth + 1)),
            None => {
                prefix.len() == resource_type.uri_spec().root().len()
                    && prefix
                        .iter()
                        .zip(resource_type.uri_spec().root())
                        .all(|(a, b)| a == b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::schema::FieldKind;

    fn playlist() -> ResourceType {
        ResourceType::builder("playlist", "/v1/playlists/{id}")
            .field("name", FieldKind::String)
            .relation("songs", "song")
            .build()
            .unwrap()
    }

    fn song() -> ResourceType {
        ResourceType::builder("song", "/v1/songs/{id}")
            .nested_under("playlist")
            .field("name", FieldKind::String)
            .field("length", FieldKind::Integer)
            .build()
            .unwrap()
    }

    fn registry() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry.register(playlist()).unwrap();
        registry.register(song()).unwrap();
        registry
    }

    #[test]
    fn test_register_then_lookup_round_trips() {
        let registry = registry();
        let song = registry.lookup("song").unwrap();
        assert_eq!(*song, self::song());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.type_names(), vec!["playlist", "song"]);
    }

    #[test]
    fn test_register_identical_type_is_idempotent() {
        let mut registry = registry();
        assert!(registry.register(song()).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_different_type_fails() {
        let mut registry = registry();
        let other = ResourceType::builder("song", "/v2/tracks/{id}").build().unwrap();

        assert_eq!(
            registry.register(other),
            Err(RegistryError::DuplicateRegistration {
                type_name: "song".to_string()
            })
        );
        assert_eq!(*registry.lookup("song").unwrap(), song());
    }

    #[test]
    fn test_lookup_unknown_type() {
        assert!(matches!(
            registry().lookup("album"),
            Err(RegistryError::UnknownResourceType { type_name }) if type_name == "album"
        ));
    }

    #[test]
    fn test_validate_accepts_consistent_registry() {
        assert!(registry().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_parent() {
        let mut registry = ResourceRegistry::new();
        registry.register(song()).unwrap();

        assert!(matches!(
            registry.validate(),
            Err(RegistryError::UnknownParentType { parent, .. }) if parent == "playlist"
        ));
    }

    #[test]
    fn test_validate_rejects_relation_to_unnested_type() {
        let mut registry = ResourceRegistry::new();
        registry.register(playlist()).unwrap();
        registry
            .register(ResourceType::builder("song", "/v1/songs/{id}").build().unwrap())
            .unwrap();

        assert!(matches!(
            registry.validate(),
            Err(RegistryError::InvalidRelation { relation, .. }) if relation == "songs"
        ));
    }

    #[test]
    fn test_match_member_uri() {
        let registry = registry();

        let (ty, parent) = registry.match_member_uri("/v1/playlists/p1").unwrap();
        assert_eq!(ty.name(), "playlist");
        assert!(parent.is_none());

        let (ty, parent) = registry
            .match_member_uri("/v1/playlists/p1/songs/s1")
            .unwrap();
        assert_eq!(ty.name(), "song");
        assert_eq!(parent, Some(ParentRef::new("playlist", "/v1/playlists/p1")));

        assert!(registry.match_member_uri("/v1/albums/a1").is_none());
        assert!(registry.match_member_uri("/v1/songs/s1").is_none());
    }
}
