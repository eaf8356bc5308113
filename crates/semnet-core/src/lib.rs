//! Semnet Core - Semantic network engine
//!
//! This crate provides the concept graph, its nested notation codec, the
//! exhaustive pattern matcher and the rule engine built on top of it.

pub mod concept;
pub mod error;
pub mod graph;
pub mod id;
pub mod limits;
pub mod matcher;
pub mod model;
pub mod notation;
pub mod relation;
pub mod rule;

pub use concept::{Concept, UNKNOWN_SIGIL};
pub use error::{Error, Result};
pub use graph::{ConceptGraph, GraphRecord};
pub use id::IdGenerator;
pub use limits::{MatchLimits, ValidationError};
pub use matcher::{Binding, Match, MatchOptions, Matcher, MATCHES_RELATION};
pub use model::{ConceptGraphModel, ModelOptions, RelationMap, RelationValue};
pub use notation::{ConceptRef, KeyDirection, RelationKey, TO_ALL_SUFFIX};
pub use relation::{Direction, Relation, RelationId};
pub use rule::{
    ChainReport, Rule, RuleBuilder, RuleEngine, BECOMES, HAS_CONCLUSION, HAS_HYPOTHESIS,
    HAS_MAPPING,
};
