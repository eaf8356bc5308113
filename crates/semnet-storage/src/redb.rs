//! ReDB knowledge store

use crate::error::{StorageError, StorageResult};
use crate::migration::Migratable;
use crate::traits::KnowledgeStore;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use semnet_core::{Concept, ConceptGraph, Relation, RelationId};
use std::path::Path;
use std::sync::Mutex;

// Table definitions
const CONCEPTS: TableDefinition<&str, &[u8]> = TableDefinition::new("concepts");
const RELATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("relations");
const META: TableDefinition<&str, u32> = TableDefinition::new("meta");
// Relation id -> triple id, for relations not stored under their triple id
const NAMED_RELATIONS: TableDefinition<&str, &str> = TableDefinition::new("named_relations");

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// ReDB knowledge store
///
/// Concepts are keyed by id and relations by relation id; both are stored as
/// JSON.
pub struct RedbStore {
    db: Mutex<Database>,
}

impl RedbStore {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path).map_err(|e| StorageError::Database(e.to_string()))?;
        let store = Self { db: Mutex::new(db) };
        store.migrate_to_latest()?;
        Ok(store)
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}

fn same_triple(existing: &Relation, incoming: &Relation) -> bool {
    existing.is_triple(&incoming.relation_type, &incoming.source, &incoming.target)
}

#[async_trait]
impl KnowledgeStore for RedbStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn create_concept_if_not_exists(&self, id: &str) -> StorageResult<bool> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let created = {
            let mut table = write_txn.open_table(CONCEPTS)?;
            if table.get(id)?.is_some() {
                false
            } else {
                let value = serde_json::to_vec(&Concept::new(id))?;
                table.insert(id, value.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if created {
            tracing::info!("Created concept {}", id);
        }
        Ok(created)
    }

    async fn get_concept_by_key(&self, key: &str) -> StorageResult<ConceptGraph> {
        let db = self.lock()?;
        let read_txn = db
            .begin_read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let table = read_txn.open_table(CONCEPTS)?;

        let mut found = ConceptGraph::new();
        if let Some(value) = table.get(key)? {
            let concept: Concept = serde_json::from_slice(value.value())?;
            found.add_concept(concept);
        }
        Ok(found)
    }

    async fn delete_concept(&self, id: &str) -> StorageResult<()> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        {
            let mut concepts = write_txn.open_table(CONCEPTS)?;
            concepts.remove(id)?;

            let mut relations = write_txn.open_table(RELATIONS)?;
            let mut named = write_txn.open_table(NAMED_RELATIONS)?;
            let mut incident = Vec::new();
            for entry in relations.iter()? {
                let (key, value) = entry?;
                let relation: Relation = serde_json::from_slice(value.value())?;
                if relation.source == id || relation.target == id {
                    incident.push(key.value().to_string());
                }
            }
            for key in &incident {
                relations.remove(key.as_str())?;
                named.remove(key.as_str())?;
            }
            tracing::debug!("Deleted concept {} and {} relations", id, incident.len());
        }
        write_txn.commit()?;

        Ok(())
    }

    async fn create_relation_if_not_exists(
        &self,
        from: &str,
        relation_type: &str,
        to: &str,
    ) -> StorageResult<bool> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let created = {
            let concepts = write_txn.open_table(CONCEPTS)?;
            for endpoint in [from, to] {
                if concepts.get(endpoint)?.is_none() {
                    return Err(semnet_core::Error::MissingConcept(endpoint.to_string()).into());
                }
            }

            let mut relations = write_txn.open_table(RELATIONS)?;
            let named = write_txn.open_table(NAMED_RELATIONS)?;
            let triple_id = RelationId::for_triple(from, relation_type, to);
            let keyed = relations
                .get(triple_id.as_str())?
                .map(|v| serde_json::from_slice::<Relation>(v.value()))
                .transpose()?;

            let mut exists = keyed
                .as_ref()
                .is_some_and(|r| r.is_triple(relation_type, from, to));
            if !exists {
                for entry in named.iter()? {
                    let (key, value) = entry?;
                    if value.value() != triple_id.as_str() {
                        continue;
                    }
                    if let Some(stored) = relations.get(key.value())? {
                        let relation: Relation = serde_json::from_slice(stored.value())?;
                        if relation.is_triple(relation_type, from, to) {
                            exists = true;
                            break;
                        }
                    }
                }
            }

            if exists {
                false
            } else if keyed.is_some() {
                return Err(semnet_core::Error::DuplicateRelation(triple_id.to_string()).into());
            } else {
                let relation = Relation::new(relation_type, from, to);
                let value = serde_json::to_vec(&relation)?;
                relations.insert(relation.id.as_str(), value.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if created {
            tracing::info!("Created relation {} -{}-> {}", from, relation_type, to);
        }
        Ok(created)
    }

    async fn load_graph(&self) -> StorageResult<ConceptGraph> {
        let db = self.lock()?;
        let read_txn = db
            .begin_read()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut graph = ConceptGraph::new();
        let concepts = read_txn.open_table(CONCEPTS)?;
        for entry in concepts.iter()? {
            let (_, value) = entry?;
            let concept: Concept = serde_json::from_slice(value.value())?;
            graph.add_concept(concept);
        }

        let relations = read_txn.open_table(RELATIONS)?;
        for entry in relations.iter()? {
            let (_, value) = entry?;
            let relation: Relation = serde_json::from_slice(value.value())?;
            graph.add_relation(relation)?;
        }

        tracing::debug!(
            "Loaded {} concepts, {} relations",
            graph.concept_count(),
            graph.relation_count()
        );
        Ok(graph)
    }

    async fn save_graph(&self, graph: &ConceptGraph) -> StorageResult<()> {
        if graph.is_empty() {
            return Ok(());
        }

        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        {
            let mut table = write_txn.open_table(CONCEPTS)?;
            for concept in graph.concepts() {
                let existing = table
                    .get(concept.id.as_str())?
                    .map(|v| serde_json::from_slice::<Concept>(v.value()))
                    .transpose()?;
                let merged = match existing {
                    Some(mut existing) => {
                        existing.merge(concept);
                        existing
                    }
                    None => concept.clone(),
                };
                let value = serde_json::to_vec(&merged)?;
                table.insert(concept.id.as_str(), value.as_slice())?;
            }
        }
        {
            let mut table = write_txn.open_table(RELATIONS)?;
            let mut named = write_txn.open_table(NAMED_RELATIONS)?;
            for relation in graph.relations() {
                let existing = table
                    .get(relation.id.as_str())?
                    .map(|v| serde_json::from_slice::<Relation>(v.value()))
                    .transpose()?;
                let merged = match existing {
                    Some(mut existing) => {
                        if !same_triple(&existing, relation) {
                            return Err(
                                semnet_core::Error::DuplicateRelation(relation.id.to_string())
                                    .into(),
                            );
                        }
                        existing.metadata.extend(relation.metadata.clone());
                        existing
                    }
                    None => relation.clone(),
                };
                let value = serde_json::to_vec(&merged)?;
                table.insert(relation.id.as_str(), value.as_slice())?;

                let triple_id = relation.triple_id();
                if relation.id != triple_id {
                    named.insert(relation.id.as_str(), triple_id.as_str())?;
                }
            }
        }
        write_txn.commit()?;
        tracing::info!(
            "Saved {} concepts, {} relations in single transaction",
            graph.concept_count(),
            graph.relation_count()
        );

        Ok(())
    }

    async fn delete_all_data(&self) -> StorageResult<()> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn.delete_table(CONCEPTS)?;
        write_txn.delete_table(RELATIONS)?;
        write_txn.delete_table(NAMED_RELATIONS)?;
        {
            let _ = write_txn.open_table(CONCEPTS)?;
            let _ = write_txn.open_table(RELATIONS)?;
            let _ = write_txn.open_table(NAMED_RELATIONS)?;
        }
        write_txn.commit()?;
        tracing::info!("Deleted all concepts and relations");

        Ok(())
    }
}

impl Migratable for RedbStore {
    fn get_schema_version(&self) -> StorageResult<u32> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let version = {
            let table = write_txn.open_table(META)?;
            let version = table.get(SCHEMA_VERSION_KEY)?.map(|v| v.value());
            version.unwrap_or(0)
        };
        write_txn.commit()?;
        Ok(version)
    }

    fn set_schema_version(&self, version: u32) -> StorageResult<()> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        {
            let mut table = write_txn.open_table(META)?;
            table.insert(SCHEMA_VERSION_KEY, version)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn run_migration(&self, version: u32) -> StorageResult<()> {
        match version {
            1 => {
                let db = self.lock()?;
                let write_txn = db
                    .begin_write()
                    .map_err(|e| StorageError::Database(e.to_string()))?;
                {
                    let _ = write_txn.open_table(CONCEPTS)?;
                    let _ = write_txn.open_table(RELATIONS)?;
                }
                write_txn.commit()?;
                Ok(())
            }
            2 => {
                let db = self.lock()?;
                let write_txn = db
                    .begin_write()
                    .map_err(|e| StorageError::Database(e.to_string()))?;
                let indexed = {
                    let relations = write_txn.open_table(RELATIONS)?;
                    let mut named = write_txn.open_table(NAMED_RELATIONS)?;
                    let mut indexed = 0;
                    for entry in relations.iter()? {
                        let (key, value) = entry?;
                        let relation: Relation = serde_json::from_slice(value.value())?;
                        let triple_id = relation.triple_id();
                        if relation.id != triple_id {
                            named.insert(key.value(), triple_id.as_str())?;
                            indexed += 1;
                        }
                    }
                    indexed
                };
                write_txn.commit()?;
                tracing::debug!("Indexed {} named relations", indexed);
                Ok(())
            }
            other => Err(StorageError::Migration(format!(
                "no migration to schema version {}",
                other
            ))),
        }
    }
}
