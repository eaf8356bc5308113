//! Semnet Storage - Knowledge stores for concept graphs
//!
//! This crate provides the backends that persist facts and rules as one
//! concept graph.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod migration;
pub mod traits;

#[cfg(feature = "redb")]
pub mod redb;

pub mod memory;

pub use error::{StorageError, StorageResult};
pub use migration::{Migratable, SchemaVersion, CURRENT_VERSION, SCHEMA_HISTORY};
pub use traits::{rule_subgraph, KnowledgeStore, RULE_PART_RELATIONS};

#[cfg(feature = "redb")]
pub use redb::RedbStore;

pub use memory::MemoryStore;
