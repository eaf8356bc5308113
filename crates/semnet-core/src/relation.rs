//! Relation (edge) types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a relation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub String);

impl RelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id for the `(source, type, target)` triple
    pub fn for_triple(source: &str, relation_type: &str, target: &str) -> Self {
        Self(format!("{}-{}->{}", source, relation_type, target))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction for selecting incident relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

/// A typed, directed relation between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Unique identifier
    pub id: RelationId,

    /// Predicate name (e.g., "is", "has_hypothesis")
    pub relation_type: String,

    /// Source concept id
    pub source: String,

    /// Target concept id
    pub target: String,

    /// Arbitrary attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Relation {
    /// Create a relation identified by its triple
    pub fn new(
        relation_type: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let relation_type = relation_type.into();
        let source = source.into();
        let target = target.into();
        Self {
            id: RelationId::for_triple(&source, &relation_type, &target),
            relation_type,
            source,
            target,
            metadata: BTreeMap::new(),
        }
    }

    /// Use an explicit id, allowing parallel relations with the same triple
    pub fn with_id(mut self, id: RelationId) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_triple(&self, relation_type: &str, source: &str, target: &str) -> bool {
        self.relation_type == relation_type && self.source == source && self.target == target
    }

    /// Id this relation would get from its triple alone
    pub fn triple_id(&self) -> RelationId {
        RelationId::for_triple(&self.source, &self.relation_type, &self.target)
    }

    /// Copy with every `from` endpoint moved to `to`.
    ///
    /// A relation identified by its triple follows the new triple; any
    /// other id is kept.
    pub fn rewired(&self, from: &str, to: &str) -> Relation {
        let mut relation = self.clone();
        if relation.source == from {
            relation.source = to.to_string();
        }
        if relation.target == from {
            relation.target = to.to_string();
        }
        if self.id == self.triple_id() {
            relation.id = relation.triple_id();
        }
        relation
    }

    /// Whether the relation touches `concept` in the given direction
    pub fn is_incident(&self, concept: &str, direction: Direction) -> bool {
        match direction {
            Direction::Outgoing => self.source == concept,
            Direction::Incoming => self.target == concept,
            Direction::Both => self.source == concept || self.target == concept,
        }
    }

    /// The endpoint opposite to `concept`, if the relation touches it
    pub fn other_end(&self, concept: &str) -> Option<&str> {
        if self.source == concept {
            Some(&self.target)
        } else if self.target == concept {
            Some(&self.source)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_creation() {
        let relation = Relation::new("is", "sky", "blue");

        assert_eq!(relation.source, "sky");
        assert_eq!(relation.target, "blue");
        assert_eq!(relation.relation_type, "is");
        assert_eq!(relation.id, RelationId::for_triple("sky", "is", "blue"));
        assert!(relation.is_triple("is", "sky", "blue"));
    }

    #[test]
    fn test_parallel_relation_ids() {
        let first = Relation::new("is", "sky", "blue");
        let second = Relation::new("is", "sky", "blue").with_id(RelationId::new("r2"));

        assert_ne!(first.id, second.id);
        assert!(second.is_triple("is", "sky", "blue"));
    }

    #[test]
    fn test_incidence() {
        let relation = Relation::new("is", "sky", "blue");

        assert!(relation.is_incident("sky", Direction::Outgoing));
        assert!(!relation.is_incident("sky", Direction::Incoming));
        assert!(relation.is_incident("blue", Direction::Both));
        assert_eq!(relation.other_end("blue"), Some("sky"));
        assert_eq!(relation.other_end("colour"), None);
    }
}
