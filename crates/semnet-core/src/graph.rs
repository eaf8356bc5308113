//! Concept graph: node/edge storage, identity rules, merge and extraction

use crate::concept::Concept;
use crate::error::{Error, Result};
use crate::id::IdGenerator;
use crate::relation::{Direction, Relation, RelationId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A labeled directed multigraph of concepts and typed relations
///
/// Concepts are keyed by id and relations by [`RelationId`]; both iterate in
/// key order. Every relation endpoint is a concept of the same graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct ConceptGraph {
    concepts: BTreeMap<String, Concept>,
    relations: BTreeMap<RelationId, Relation>,
    /// Relations whose id is not the id of their own triple
    named: BTreeSet<RelationId>,
}

/// Flat serialized form of a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphRecord {
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl TryFrom<GraphRecord> for ConceptGraph {
    type Error = Error;

    fn try_from(record: GraphRecord) -> Result<Self> {
        let mut graph = ConceptGraph::new();
        for concept in record.concepts {
            graph.add_concept(concept);
        }
        for relation in record.relations {
            graph.add_relation(relation)?;
        }
        Ok(graph)
    }
}

impl From<ConceptGraph> for GraphRecord {
    fn from(graph: ConceptGraph) -> Self {
        Self {
            concepts: graph.concepts.into_values().collect(),
            relations: graph.relations.into_values().collect(),
        }
    }
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.relations.is_empty()
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Concepts
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a concept, merging attributes if the id already exists
    pub fn add_concept(&mut self, concept: Concept) {
        match self.concepts.get_mut(&concept.id) {
            Some(existing) => existing.merge(&concept),
            None => {
                self.concepts.insert(concept.id.clone(), concept);
            }
        }
    }

    /// Insert `concept` under `id` unless `id` is already present.
    ///
    /// Returns whether the concept was inserted.
    pub fn add_concept_if_not_exists(&mut self, id: &str, mut concept: Concept) -> bool {
        if self.concepts.contains_key(id) {
            return false;
        }
        concept.id = id.to_string();
        self.concepts.insert(concept.id.clone(), concept);
        true
    }

    /// Add a concept under a freshly minted id and return that id
    pub fn add_fresh_concept(
        &mut self,
        ids: &mut IdGenerator,
        description: impl Into<String>,
    ) -> String {
        let id = ids.next_free(self);
        self.concepts.insert(
            id.clone(),
            Concept::new(id.clone()).with_description(description),
        );
        id
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Look up a concept that must exist
    pub fn require_concept(&self, id: &str) -> Result<&Concept> {
        self.concepts
            .get(id)
            .ok_or_else(|| Error::MissingConcept(id.to_string()))
    }

    pub fn contains_concept(&self, id: &str) -> bool {
        self.concepts.contains_key(id)
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub fn concept_ids(&self) -> impl Iterator<Item = &str> {
        self.concepts.keys().map(String::as_str)
    }

    pub fn known_concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values().filter(|c| !c.is_unknown)
    }

    pub fn unknown_concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values().filter(|c| c.is_unknown)
    }

    /// Delete a concept together with every relation touching it
    pub fn remove_concept(&mut self, id: &str) -> Result<Concept> {
        let concept = self
            .concepts
            .remove(id)
            .ok_or_else(|| Error::MissingConcept(id.to_string()))?;
        self.relations
            .retain(|_, r| !r.is_incident(id, Direction::Both));
        let relations = &self.relations;
        self.named.retain(|named| relations.contains_key(named));
        Ok(concept)
    }

    /// Replace every occurrence of `placeholder` with `replacement`.
    ///
    /// The placeholder concept is removed, the replacement is added (merged if
    /// already present) and incident relations are rewired onto it. Relations
    /// identified by their triple get the id of their new triple.
    pub fn substitute(&mut self, placeholder: &str, replacement: &Concept) -> Result<()> {
        self.require_concept(placeholder)?;
        if placeholder == replacement.id {
            self.add_concept(replacement.clone());
            return Ok(());
        }

        let incident: Vec<RelationId> = self
            .relations
            .values()
            .filter(|r| r.is_incident(placeholder, Direction::Both))
            .map(|r| r.id.clone())
            .collect();
        let rewired: Vec<Relation> = incident
            .iter()
            .filter_map(|id| self.relations.get(id))
            .map(|r| r.rewired(placeholder, &replacement.id))
            .collect();

        // Nothing is touched until every rewired relation is known to fit.
        let removed: BTreeSet<&RelationId> = incident.iter().collect();
        let mut staged: BTreeMap<&RelationId, &Relation> = BTreeMap::new();
        for relation in &rewired {
            let existing = staged.get(&relation.id).copied().or_else(|| {
                self.relations
                    .get(&relation.id)
                    .filter(|r| !removed.contains(&r.id))
            });
            if let Some(existing) = existing {
                if !existing.is_triple(&relation.relation_type, &relation.source, &relation.target)
                {
                    return Err(Error::DuplicateRelation(relation.id.to_string()));
                }
            }
            staged.insert(&relation.id, relation);
        }

        self.concepts.remove(placeholder);
        self.add_concept(replacement.clone());
        for id in &incident {
            self.remove_relation(id);
        }
        for relation in rewired {
            self.add_relation(relation)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Relations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a relation by id, merging metadata if the id already exists.
    ///
    /// Both endpoints must already be concepts of this graph.
    pub fn add_relation(&mut self, relation: Relation) -> Result<()> {
        self.require_concept(&relation.source)?;
        self.require_concept(&relation.target)?;

        match self.relations.get_mut(&relation.id) {
            Some(existing) => {
                if !existing.is_triple(&relation.relation_type, &relation.source, &relation.target)
                {
                    return Err(Error::DuplicateRelation(relation.id.to_string()));
                }
                existing.metadata.extend(relation.metadata);
            }
            None => self.insert_relation(relation),
        }
        Ok(())
    }

    /// Insert `source -relation_type-> target` unless that triple exists.
    ///
    /// Returns whether a relation was inserted.
    pub fn add_relation_if_not_exists(
        &mut self,
        relation_type: &str,
        source: &str,
        target: &str,
    ) -> Result<bool> {
        self.require_concept(source)?;
        self.require_concept(target)?;

        if self.has_relation(relation_type, source, target) {
            return Ok(false);
        }
        self.add_relation(Relation::new(relation_type, source, target))?;
        Ok(true)
    }

    pub fn remove_relation(&mut self, id: &RelationId) -> Option<Relation> {
        self.named.remove(id);
        self.relations.remove(id)
    }

    fn insert_relation(&mut self, relation: Relation) {
        if relation.id != relation.triple_id() {
            self.named.insert(relation.id.clone());
        }
        self.relations.insert(relation.id.clone(), relation);
    }

    pub fn relation(&self, id: &RelationId) -> Option<&Relation> {
        self.relations.get(id)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Relations incident to a concept in the given direction
    pub fn relations_of<'a>(
        &'a self,
        id: &'a str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations
            .values()
            .filter(move |r| r.is_incident(id, direction))
    }

    pub fn relations_of_type<'a>(
        &'a self,
        relation_type: &'a str,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations
            .values()
            .filter(move |r| r.relation_type == relation_type)
    }

    /// Whether any relation, whatever its id, links this triple
    pub fn has_relation(&self, relation_type: &str, source: &str, target: &str) -> bool {
        let by_triple = self
            .relations
            .get(&RelationId::for_triple(source, relation_type, target))
            .is_some_and(|r| r.is_triple(relation_type, source, target));
        by_triple
            || self.named.iter().any(|id| {
                self.relations
                    .get(id)
                    .is_some_and(|r| r.is_triple(relation_type, source, target))
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Whole-graph operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Union `other` into this graph; `other` is left untouched
    pub fn merge_from(&mut self, other: &ConceptGraph) -> Result<()> {
        for concept in other.concepts.values() {
            self.add_concept(concept.clone());
        }
        for relation in other.relations.values() {
            self.add_relation(relation.clone())?;
        }
        Ok(())
    }

    /// Subgraph induced by `ids`: those concepts and every relation between them
    ///
    /// Ids missing from this graph are ignored.
    pub fn induced_subgraph<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> ConceptGraph {
        let members: BTreeSet<&str> = ids
            .into_iter()
            .filter(|id| self.concepts.contains_key(*id))
            .collect();

        let mut subgraph = ConceptGraph::new();
        for id in &members {
            if let Some(concept) = self.concepts.get(*id) {
                subgraph
                    .concepts
                    .insert(concept.id.clone(), concept.clone());
            }
        }
        for relation in self.relations.values() {
            if members.contains(relation.source.as_str())
                && members.contains(relation.target.as_str())
            {
                subgraph.insert_relation(relation.clone());
            }
        }
        subgraph
    }

    /// Induced subgraph over every target of a `relation_type` relation
    ///
    /// Pulls a named sub-structure, such as a rule's hypothesis, out of a
    /// larger graph.
    pub fn concept_definition(&self, relation_type: &str) -> ConceptGraph {
        let targets: BTreeSet<&str> = self
            .relations_of_type(relation_type)
            .map(|r| r.target.as_str())
            .collect();
        self.induced_subgraph(targets)
    }

    /// Like [`concept_definition`](Self::concept_definition), restricted to
    /// relations leaving `root`
    pub fn concept_definition_of(&self, root: &str, relation_type: &str) -> ConceptGraph {
        let targets: BTreeSet<&str> = self
            .relations_of(root, Direction::Outgoing)
            .filter(|r| r.relation_type == relation_type)
            .map(|r| r.target.as_str())
            .collect();
        self.induced_subgraph(targets)
    }
}
