//! Knowledge store trait definitions

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use semnet_core::{ConceptGraph, Direction, Matcher, HAS_CONCLUSION, HAS_HYPOTHESIS, HAS_MAPPING};
use std::collections::BTreeSet;

/// Relation types linking a rule root to its parts
pub const RULE_PART_RELATIONS: [&str; 3] = [HAS_HYPOTHESIS, HAS_MAPPING, HAS_CONCLUSION];

/// Trait for knowledge store implementations
///
/// A store holds one concept graph shared by facts and rules.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Concept Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a known concept unless one with this id exists.
    ///
    /// Returns whether the concept was created.
    async fn create_concept_if_not_exists(&self, id: &str) -> StorageResult<bool>;

    /// One-concept graph for `key`, or an empty graph
    async fn get_concept_by_key(&self, key: &str) -> StorageResult<ConceptGraph>;

    /// Delete a concept and every relation touching it
    async fn delete_concept(&self, id: &str) -> StorageResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Relation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create `from -relation_type-> to` unless that triple exists.
    ///
    /// Both concepts must exist.
    async fn create_relation_if_not_exists(
        &self,
        from: &str,
        relation_type: &str,
        to: &str,
    ) -> StorageResult<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the entire stored graph
    async fn load_graph(&self) -> StorageResult<ConceptGraph>;

    /// Merge `graph` into the stored graph
    async fn save_graph(&self, graph: &ConceptGraph) -> StorageResult<()>;

    /// Remove every concept and relation
    async fn delete_all_data(&self) -> StorageResult<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Match `query` against the stored graph and union every match
    async fn find_and_merge_matches(&self, query: &ConceptGraph) -> StorageResult<ConceptGraph> {
        self.find_and_merge_matches_with(query, &Matcher::default())
            .await
    }

    async fn find_and_merge_matches_with(
        &self,
        query: &ConceptGraph,
        matcher: &Matcher,
    ) -> StorageResult<ConceptGraph> {
        let data = self.load_graph().await?;
        let mut merged = ConceptGraph::new();
        for result in matcher.match_graphs(query, &data)? {
            merged.merge_from(&result)?;
        }
        tracing::debug!(
            "Query merged into {} concepts, {} relations",
            merged.concept_count(),
            merged.relation_count()
        );
        Ok(merged)
    }

    /// The stored rule rooted at `name`: the root, the direct targets of its
    /// part relations, and every stored relation among them
    async fn get_rule_by_name(&self, name: &str) -> StorageResult<ConceptGraph> {
        let data = self.load_graph().await?;
        rule_subgraph(&data, name)
    }
}

/// Cut the rule rooted at `name` out of a stored graph
pub fn rule_subgraph(data: &ConceptGraph, name: &str) -> StorageResult<ConceptGraph> {
    if !data.contains_concept(name) {
        return Err(StorageError::RuleNotFound(name.to_string()));
    }

    let mut members: BTreeSet<&str> = data
        .relations_of(name, Direction::Outgoing)
        .filter(|r| RULE_PART_RELATIONS.contains(&r.relation_type.as_str()))
        .map(|r| r.target.as_str())
        .collect();
    members.insert(name);
    Ok(data.induced_subgraph(members))
}
