//! Dirty tracking for partial updates.
//!
//! [`FieldTracker`] stores a resource's field map alongside the set of fields
//! assigned since the last load or successful save. Only those fields are
//! sent in update requests.
//!
//! # Example
//!
//! ```rust
//! use restmap::rest::{FieldTracker, FieldValue};
//!
//! let mut tracker = FieldTracker::from_values([
//!     ("name".to_string(), FieldValue::from("Flutes")),
//!     ("length".to_string(), FieldValue::from(1234)),
//! ]);
//! assert!(!tracker.is_dirty());
//!
//! tracker.set("length", 1235);
//! assert!(tracker.is_dirty());
//! assert_eq!(tracker.dirty_fields().collect::<Vec<_>>(), vec!["length"]);
//!
//! tracker.mark_clean();
//! assert!(!tracker.is_dirty());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::rest::value::FieldValue;

/// A field map with a parallel dirty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTracker {
    values: BTreeMap<String, FieldValue>,
    dirty: BTreeSet<String>,
}

impl FieldTracker {
    /// Creates an empty, clean tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clean tracker holding `values`.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = (String, FieldValue)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            dirty: BTreeSet::new(),
        }
    }

    /// Returns a field's current value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Assigns a field and marks it dirty, even if the value is unchanged.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        self.values.insert(name.clone(), value.into());
        self.dirty.insert(name);
    }

    /// Returns `true` if any field was assigned since the last clean point.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns `true` if `name` was assigned since the last clean point.
    #[must_use]
    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Returns the dirty field names, sorted.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.dirty.iter().map(String::as_str)
    }

    /// Returns the dirty fields with their current values.
    pub fn changed_values(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.dirty
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    /// Returns all fields, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Clears the dirty set.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Overwrites fields with server values without marking them dirty.
    pub fn merge(&mut self, values: impl IntoIterator<Item = (String, FieldValue)>) {
        self.values.extend(values);
    }

    /// Replaces every field with server values and clears the dirty set.
    pub fn replace(&mut self, values: impl IntoIterator<Item = (String, FieldValue)>) {
        self.values = values.into_iter().collect();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_clean() {
        let tracker = FieldTracker::new();
        assert!(!tracker.is_dirty());
        assert!(tracker.get("name").is_none());
    }

    #[test]
    fn test_set_marks_dirty_even_when_unchanged() {
        let mut tracker =
            FieldTracker::from_values([("name".to_string(), FieldValue::from("Flutes"))]);
        tracker.set("name", "Flutes");
        assert!(tracker.is_field_dirty("name"));
    }

    #[test]
    fn test_changed_values_only_lists_dirty_fields() {
        let mut tracker = FieldTracker::from_values([
            ("name".to_string(), FieldValue::from("Flutes")),
            ("length".to_string(), FieldValue::from(1234)),
        ]);
        tracker.set("length", 1235);

        let changed: Vec<(&str, &FieldValue)> = tracker.changed_values().collect();
        assert_eq!(changed, vec![("length", &FieldValue::Integer(1235))]);
    }

    #[test]
    fn test_merge_keeps_dirty_set() {
        let mut tracker = FieldTracker::new();
        tracker.set("name", "Flutes");
        tracker.merge([("id".to_string(), FieldValue::from("s9"))]);

        assert_eq!(tracker.get("id"), Some(&FieldValue::from("s9")));
        assert_eq!(tracker.dirty_fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_replace_clears_dirty_set() {
        let mut tracker = FieldTracker::new();
        tracker.set("name", "Flutes");
        tracker.replace([("name".to_string(), FieldValue::from("Oboes"))]);

        assert!(!tracker.is_dirty());
        assert_eq!(tracker.get("name"), Some(&FieldValue::from("Oboes")));
    }
}
