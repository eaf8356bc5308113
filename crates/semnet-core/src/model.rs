//! Nested textual notation for concept graphs
//!
//! ```json
//! {
//!   "sky": { "-is->": { "blue": { "-is->": "colour" } } },
//!   "?x":  { "<-attr-": "sky" }
//! }
//! ```
//!
//! Top-level keys are concept references (`?` marks an unknown). Each value
//! maps relation keys to a concept reference, a nested model whose keys are
//! further concepts, or a list of either.
//!
//! Encoding expands each concept at most once per call. A concept reached
//! again is written as a bare reference (an empty sub-model), so cycles
//! terminate; their relations were already written on the first visit.

use crate::concept::Concept;
use crate::error::{Error, Result};
use crate::graph::ConceptGraph;
use crate::notation::{ConceptRef, KeyDirection, RelationKey};
use crate::relation::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Relation keys of one concept mapped to their values
pub type RelationMap = BTreeMap<String, RelationValue>;

/// Value under a relation key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationValue {
    /// A single concept reference
    Concept(String),
    /// Several values for the same key
    Many(Vec<RelationValue>),
    /// Further concepts, each with its own relations
    Nested(ConceptGraphModel),
}

/// A graph in the nested notation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptGraphModel(pub BTreeMap<String, RelationMap>);

impl ConceptGraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, reference: impl Into<String>, relations: RelationMap) {
        self.0.insert(reference.into(), relations);
    }
}

impl std::str::FromStr for ConceptGraphModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Encoder options
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptions {
    /// Tag relation types that fan out to several targets with `:to_all`
    pub mark_fan_out: bool,
}

impl ConceptGraph {
    /// Decode a model, registering every referenced concept once
    pub fn from_model(model: &ConceptGraphModel) -> Result<Self> {
        let mut graph = ConceptGraph::new();
        decode_model(&mut graph, model)?;
        Ok(graph)
    }

    /// Parse JSON notation text
    pub fn from_notation_str(text: &str) -> Result<Self> {
        let model: ConceptGraphModel = text.parse()?;
        Self::from_model(&model)
    }

    /// Encode the graph, or only what is reachable from `root`
    pub fn to_model(&self, root: Option<&str>) -> Result<ConceptGraphModel> {
        self.to_model_with(root, ModelOptions::default())
    }

    pub fn to_model_with(
        &self,
        root: Option<&str>,
        options: ModelOptions,
    ) -> Result<ConceptGraphModel> {
        let mut encoder = Encoder {
            graph: self,
            options,
            visited: BTreeSet::new(),
        };
        let mut model = ConceptGraphModel::new();

        match root {
            Some(root) => {
                let concept = self.require_concept(root)?;
                let relations = encoder.encode_concept(&concept.id);
                model.insert(concept.notation_ref(), relations);
            }
            None => {
                let has_incoming: BTreeSet<&str> =
                    self.relations().map(|r| r.target.as_str()).collect();
                let sources = self
                    .concepts()
                    .filter(|c| !has_incoming.contains(c.id.as_str()));
                let ordered: Vec<&Concept> = sources
                    .chain(self.concepts().filter(|c| has_incoming.contains(c.id.as_str())))
                    .collect();

                for concept in ordered {
                    if encoder.visited.contains(concept.id.as_str()) {
                        continue;
                    }
                    let relations = encoder.encode_concept(&concept.id);
                    model.insert(concept.notation_ref(), relations);
                }
            }
        }
        Ok(model)
    }

    /// Pretty JSON notation text
    pub fn to_notation_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_model(None)?)?)
    }
}

fn register(graph: &mut ConceptGraph, reference: &str) -> Result<String> {
    let reference = ConceptRef::parse(reference)?;
    let concept = if reference.is_unknown {
        Concept::unknown(reference.id.clone())
    } else {
        Concept::new(reference.id.clone())
    };
    graph.add_concept_if_not_exists(&reference.id, concept);
    Ok(reference.id)
}

fn decode_model(graph: &mut ConceptGraph, model: &ConceptGraphModel) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(model.0.len());
    for (reference, relations) in &model.0 {
        let id = register(graph, reference)?;
        decode_relations(graph, &id, relations)?;
        ids.push(id);
    }
    Ok(ids)
}

fn decode_relations(graph: &mut ConceptGraph, id: &str, relations: &RelationMap) -> Result<()> {
    for (key, value) in relations {
        let key = RelationKey::parse(key)?;
        for other in decode_value(graph, value)? {
            match key.direction {
                KeyDirection::Forward => {
                    graph.add_relation_if_not_exists(&key.relation_type, id, &other)?
                }
                KeyDirection::Backward => {
                    graph.add_relation_if_not_exists(&key.relation_type, &other, id)?
                }
            };
        }
    }
    Ok(())
}

fn decode_value(graph: &mut ConceptGraph, value: &RelationValue) -> Result<Vec<String>> {
    match value {
        RelationValue::Concept(reference) => Ok(vec![register(graph, reference)?]),
        RelationValue::Many(values) => {
            let mut ids = Vec::new();
            for value in values {
                ids.extend(decode_value(graph, value)?);
            }
            Ok(ids)
        }
        RelationValue::Nested(model) => decode_model(graph, model),
    }
}

struct Encoder<'a> {
    graph: &'a ConceptGraph,
    options: ModelOptions,
    visited: BTreeSet<&'a str>,
}

impl<'a> Encoder<'a> {
    fn encode_concept(&mut self, id: &'a str) -> RelationMap {
        self.visited.insert(id);

        let mut by_type: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for relation in self.graph.relations_of(id, Direction::Outgoing) {
            let targets = by_type.entry(relation.relation_type.as_str()).or_default();
            if !targets.contains(&relation.target.as_str()) {
                targets.push(relation.target.as_str());
            }
        }

        let mut relations = RelationMap::new();
        for (relation_type, targets) in by_type {
            let fan_out = targets.len() > 1;
            let key = RelationKey::forward(relation_type)
                .with_to_all(fan_out && self.options.mark_fan_out)
                .to_string();

            let value = if let [target] = *targets.as_slice() {
                let sub = self.encode_target(target);
                let reference = self.reference(target);
                if sub.is_empty() {
                    RelationValue::Concept(reference)
                } else {
                    let mut nested = ConceptGraphModel::new();
                    nested.insert(reference, sub);
                    RelationValue::Nested(nested)
                }
            } else {
                let mut nested = ConceptGraphModel::new();
                for target in targets {
                    let sub = self.encode_target(target);
                    nested.insert(self.reference(target), sub);
                }
                RelationValue::Nested(nested)
            };
            relations.insert(key, value);
        }
        relations
    }

    fn encode_target(&mut self, id: &'a str) -> RelationMap {
        if self.visited.contains(id) {
            RelationMap::new()
        } else {
            self.encode_concept(id)
        }
    }

    fn reference(&self, id: &str) -> String {
        self.graph
            .concept(id)
            .map(Concept::notation_ref)
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ConceptGraph {
        let model: ConceptGraphModel = serde_json::from_value(value).unwrap();
        ConceptGraph::from_model(&model).unwrap()
    }

    fn triples(graph: &ConceptGraph) -> Vec<(String, String, String)> {
        graph
            .relations()
            .map(|r| (r.source.clone(), r.relation_type.clone(), r.target.clone()))
            .collect()
    }

    #[test]
    fn test_decode_forward_and_nested() {
        let graph = parse(json!({
            "sky": { "-is->": { "blue": { "-is->": "colour" } } }
        }));

        assert_eq!(graph.concept_count(), 3);
        assert!(graph.has_relation("is", "sky", "blue"));
        assert!(graph.has_relation("is", "blue", "colour"));
    }

    #[test]
    fn test_decode_backward() {
        let graph = parse(json!({ "blue": { "<-is-": "sky" } }));

        assert!(graph.has_relation("is", "sky", "blue"));
        assert!(!graph.has_relation("is", "blue", "sky"));
    }

    #[test]
    fn test_decode_unknown_sigil() {
        let graph = parse(json!({ "?u": { "-is->": "blue" } }));

        let unknown = graph.concept("?u").unwrap();
        assert!(unknown.is_unknown);
        assert!(!graph.concept("blue").unwrap().is_unknown);
    }

    #[test]
    fn test_decode_registers_once() {
        let graph = parse(json!({
            "sky": { "-is->": "blue" },
            "blue": { "-is->": "colour", "<-is-": "sky" }
        }));

        assert_eq!(graph.concept_count(), 3);
        assert_eq!(graph.relation_count(), 2);
    }

    #[test]
    fn test_decode_list_value() {
        let graph = parse(json!({ "sky": { "-is->": ["blue", { "big": {} }] } }));

        assert!(graph.has_relation("is", "sky", "blue"));
        assert!(graph.has_relation("is", "sky", "big"));
    }

    #[test]
    fn test_decode_rejects_bad_key() {
        let model: ConceptGraphModel =
            serde_json::from_value(json!({ "sky": { "is": "blue" } })).unwrap();

        assert!(matches!(
            ConceptGraph::from_model(&model),
            Err(Error::Notation(_))
        ));
    }

    #[test]
    fn test_encode_single_target() {
        let graph = parse(json!({ "sky": { "-is->": "blue" } }));
        let model = graph.to_model(None).unwrap();

        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({ "sky": { "-is->": "blue" } })
        );
    }

    #[test]
    fn test_encode_fan_out_nests_targets() {
        let graph = parse(json!({ "sky": { "-is->": ["blue", "big"] } }));
        let model = graph.to_model(None).unwrap();

        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({ "sky": { "-is->": { "big": {}, "blue": {} } } })
        );
    }

    #[test]
    fn test_encode_marks_fan_out() {
        let graph = parse(json!({ "sky": { "-is->": ["blue", "big"], "-near->": "sun" } }));
        let model = graph
            .to_model_with(None, ModelOptions { mark_fan_out: true })
            .unwrap();
        let value = serde_json::to_value(&model).unwrap();

        assert!(value["sky"].get("-is:to_all->").is_some());
        assert!(value["sky"].get("-near->").is_some());
        assert_eq!(ConceptGraph::from_model(&model).unwrap(), graph);
    }

    #[test]
    fn test_round_trip_acyclic() {
        let graph = parse(json!({
            "rule": {
                "-has_hypothesis->": { "?x": { "-attr->": "light_blue" }, "light_blue": {} },
                "-has_conclusion->": { "?y": { "-attr->": "blue" }, "blue": {} }
            },
            "?x": { "-becomes->": "?y" },
            "island": {}
        }));

        let model = graph.to_model(None).unwrap();
        let reparsed = ConceptGraph::from_model(&model).unwrap();

        assert_eq!(reparsed, graph);
        let again = reparsed.to_model(None).unwrap();
        assert_eq!(again, model);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = parse(json!({
            "a": { "-next->": { "b": { "-next->": { "c": { "-next->": "a" } } } } }
        }));

        let model = graph.to_model(None).unwrap();
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(
            value,
            json!({ "a": { "-next->": { "b": { "-next->": { "c": { "-next->": "a" } } } } } })
        );
        assert_eq!(triples(&ConceptGraph::from_model(&model).unwrap()), triples(&graph));
    }

    #[test]
    fn test_encode_from_root() {
        let graph = parse(json!({
            "sky": { "-is->": "blue" },
            "grass": { "-is->": "green" }
        }));

        let model = graph.to_model(Some("grass")).unwrap();
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({ "grass": { "-is->": "green" } })
        );
        assert!(matches!(
            graph.to_model(Some("sea")),
            Err(Error::MissingConcept(_))
        ));
    }

    #[test]
    fn test_notation_string() {
        let graph =
            ConceptGraph::from_notation_str(r#"{"sky": {"-is->": "blue"}}"#).unwrap();
        let text = graph.to_notation_string().unwrap();

        assert_eq!(ConceptGraph::from_notation_str(&text).unwrap(), graph);
    }
}
