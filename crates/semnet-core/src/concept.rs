//! Concept (node) types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix marking a concept reference as an unknown in the notation
pub const UNKNOWN_SIGIL: char = '?';

/// A concept in the semantic network (a node)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Storage key, unique within a graph
    pub id: String,

    /// Display label
    pub description: String,

    /// Free variable for matching
    #[serde(default)]
    pub is_unknown: bool,

    /// Arbitrary attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Concept {
    /// Create a concrete concept whose description is its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            description: id.clone(),
            id,
            is_unknown: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Create an unknown (variable) concept
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            is_unknown: true,
            ..Self::new(id)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Merge another concept's attributes onto this one.
    ///
    /// The incoming description and unknown flag win; metadata is extended
    /// key by key.
    pub fn merge(&mut self, other: &Concept) {
        self.description = other.description.clone();
        self.is_unknown = other.is_unknown;
        for (key, value) in &other.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
    }

    /// Id as written in the notation, with the unknown sigil when needed
    pub fn notation_ref(&self) -> String {
        if self.is_unknown && !self.id.starts_with(UNKNOWN_SIGIL) {
            format!("{}{}", UNKNOWN_SIGIL, self.id)
        } else {
            self.id.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_creation() {
        let concept = Concept::new("sky");

        assert_eq!(concept.id, "sky");
        assert_eq!(concept.description, "sky");
        assert!(!concept.is_unknown);
        assert!(concept.metadata.is_empty());
    }

    #[test]
    fn test_merge_overwrites_attributes() {
        let mut concept = Concept::new("sky").with_metadata("size", serde_json::json!("big"));
        let other = Concept::new("sky")
            .with_description("the sky")
            .with_metadata("colour", serde_json::json!("blue"));

        concept.merge(&other);

        assert_eq!(concept.description, "the sky");
        assert_eq!(concept.metadata.len(), 2);
        assert_eq!(concept.metadata["colour"], serde_json::json!("blue"));
    }

    #[test]
    fn test_notation_ref() {
        assert_eq!(Concept::unknown("?x").notation_ref(), "?x");
        assert_eq!(Concept::unknown("x").notation_ref(), "?x");
        assert_eq!(Concept::new("x").notation_ref(), "x");
    }
}
