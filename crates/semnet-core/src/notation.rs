//! Typed relation keys and concept references of the textual notation
//!
//! Map keys such as `-is->` or `<-is-` and concept references such as `?x` are
//! decoded into these types at the notation boundary; the graph itself never
//! sees the arrow syntax.

use crate::concept::UNKNOWN_SIGIL;
use crate::error::{Error, Result};
use crate::limits::validate_concept_id;

/// Relation type suffix asking the encoder to expand every fan-out target
pub const TO_ALL_SUFFIX: &str = ":to_all";

/// Which way a relation key points, relative to the enclosing concept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// `-type->`: enclosing concept is the source
    Forward,
    /// `<-type-`: enclosing concept is the target
    Backward,
}

/// A decoded relation key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationKey {
    pub direction: KeyDirection,
    pub relation_type: String,
    /// The key carried the `:to_all` suffix
    pub to_all: bool,
}

impl RelationKey {
    pub fn forward(relation_type: impl Into<String>) -> Self {
        Self {
            direction: KeyDirection::Forward,
            relation_type: relation_type.into(),
            to_all: false,
        }
    }

    pub fn backward(relation_type: impl Into<String>) -> Self {
        Self {
            direction: KeyDirection::Backward,
            relation_type: relation_type.into(),
            to_all: false,
        }
    }

    pub fn with_to_all(mut self, to_all: bool) -> Self {
        self.to_all = to_all;
        self
    }

    /// Parse `-type->` or `<-type-`
    pub fn parse(key: &str) -> Result<Self> {
        let (direction, inner) = if let Some(inner) = key
            .strip_prefix("<-")
            .and_then(|rest| rest.strip_suffix('-'))
        {
            (KeyDirection::Backward, inner)
        } else if let Some(inner) = key
            .strip_prefix('-')
            .and_then(|rest| rest.strip_suffix("->"))
        {
            (KeyDirection::Forward, inner)
        } else {
            return Err(Error::Notation(format!(
                "relation key must look like -type-> or <-type-, got '{}'",
                key
            )));
        };

        let (relation_type, to_all) = match inner.strip_suffix(TO_ALL_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };

        if relation_type.is_empty() {
            return Err(Error::Notation(format!("empty relation type in '{}'", key)));
        }

        Ok(Self {
            direction,
            relation_type: relation_type.to_string(),
            to_all,
        })
    }
}

impl std::fmt::Display for RelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = if self.to_all { TO_ALL_SUFFIX } else { "" };
        match self.direction {
            KeyDirection::Forward => write!(f, "-{}{}->", self.relation_type, suffix),
            KeyDirection::Backward => write!(f, "<-{}{}-", self.relation_type, suffix),
        }
    }
}

/// A concept reference as written in the notation
///
/// The sigil stays part of the id: `?x` refers to the unknown concept `?x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRef {
    pub id: String,
    pub is_unknown: bool,
}

impl ConceptRef {
    pub fn parse(reference: &str) -> Result<Self> {
        validate_concept_id(reference)?;
        if reference == UNKNOWN_SIGIL.to_string() {
            return Err(Error::Notation(format!(
                "invalid concept reference '{}'",
                reference
            )));
        }
        Ok(Self {
            id: reference.to_string(),
            is_unknown: reference.starts_with(UNKNOWN_SIGIL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forward() {
        let key = RelationKey::parse("-is->").unwrap();
        assert_eq!(key, RelationKey::forward("is"));
        assert_eq!(key.to_string(), "-is->");
    }

    #[test]
    fn test_parse_backward() {
        let key = RelationKey::parse("<-has_hypothesis-").unwrap();
        assert_eq!(key, RelationKey::backward("has_hypothesis"));
        assert_eq!(key.to_string(), "<-has_hypothesis-");
    }

    #[test]
    fn test_parse_to_all() {
        let key = RelationKey::parse("-next:to_all->").unwrap();
        assert_eq!(key.relation_type, "next");
        assert!(key.to_all);
        assert_eq!(key.to_string(), "-next:to_all->");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RelationKey::parse("is").is_err());
        assert!(RelationKey::parse("-is").is_err());
        assert!(RelationKey::parse("-->").is_err());
        assert!(RelationKey::parse("<--").is_err());
    }

    #[test]
    fn test_concept_ref() {
        assert!(ConceptRef::parse("?x").unwrap().is_unknown);
        assert!(!ConceptRef::parse("sky").unwrap().is_unknown);
        assert!(ConceptRef::parse("?").is_err());
        assert!(ConceptRef::parse(&"x".repeat(300)).is_err());
        assert!(ConceptRef::parse("").is_err());
    }
}
