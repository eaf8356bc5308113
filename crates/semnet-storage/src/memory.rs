//! In-memory knowledge store

use crate::error::{StorageError, StorageResult};
use crate::traits::KnowledgeStore;
use async_trait::async_trait;
use semnet_core::{Concept, ConceptGraph};
use std::sync::RwLock;

/// In-memory knowledge store
///
/// Useful for testing and one-shot runs.
pub struct MemoryStore {
    graph: RwLock<ConceptGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(ConceptGraph::new()),
        }
    }

    /// Store seeded with an existing graph
    pub fn with_graph(graph: ConceptGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn create_concept_if_not_exists(&self, id: &str) -> StorageResult<bool> {
        let mut graph = self
            .graph
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        Ok(graph.add_concept_if_not_exists(id, Concept::new(id)))
    }

    async fn get_concept_by_key(&self, key: &str) -> StorageResult<ConceptGraph> {
        let graph = self
            .graph
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        let mut found = ConceptGraph::new();
        if let Some(concept) = graph.concept(key) {
            found.add_concept(concept.clone());
        }
        Ok(found)
    }

    async fn delete_concept(&self, id: &str) -> StorageResult<()> {
        let mut graph = self
            .graph
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        if graph.contains_concept(id) {
            graph.remove_concept(id)?;
        }
        Ok(())
    }

    async fn create_relation_if_not_exists(
        &self,
        from: &str,
        relation_type: &str,
        to: &str,
    ) -> StorageResult<bool> {
        let mut graph = self
            .graph
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        Ok(graph.add_relation_if_not_exists(relation_type, from, to)?)
    }

    async fn load_graph(&self) -> StorageResult<ConceptGraph> {
        let graph = self
            .graph
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        Ok(graph.clone())
    }

    async fn save_graph(&self, incoming: &ConceptGraph) -> StorageResult<()> {
        let mut graph = self
            .graph
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        graph.merge_from(incoming)?;
        Ok(())
    }

    async fn delete_all_data(&self) -> StorageResult<()> {
        let mut graph = self
            .graph
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?;
        *graph = ConceptGraph::new();
        Ok(())
    }
}
