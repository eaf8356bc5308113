//! Schema versioning for persistent knowledge stores
//!
//! A backend records the version of its table layout and brings older
//! files forward one step at a time when it is opened.

use crate::{StorageError, StorageResult};

/// Table layout written by this build
pub const CURRENT_VERSION: u32 = 2;

/// One step in the schema history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: u32,
    pub description: &'static str,
}

/// Every schema step, oldest first
pub const SCHEMA_HISTORY: &[SchemaVersion] = &[
    SchemaVersion {
        version: 1,
        description: "concepts keyed by id, relations keyed by relation id, meta table",
    },
    SchemaVersion {
        version: 2,
        description: "index of relations stored under their own ids",
    },
];

/// Look up the description of a schema step
pub fn describe(version: u32) -> Option<&'static str> {
    SCHEMA_HISTORY
        .iter()
        .find(|step| step.version == version)
        .map(|step| step.description)
}

pub trait Migratable {
    /// Stored version, 0 for a file that has never been migrated
    fn get_schema_version(&self) -> StorageResult<u32>;

    fn set_schema_version(&self, version: u32) -> StorageResult<()>;

    /// Bring the layout from `version - 1` to `version`
    fn run_migration(&self, version: u32) -> StorageResult<()>;

    /// Apply every step after the stored version up to `target`.
    ///
    /// A file written by a newer build is refused rather than read with
    /// the wrong layout.
    fn migrate_to(&self, target: u32) -> StorageResult<()> {
        let stored = self.get_schema_version()?;
        if stored > target {
            return Err(StorageError::Migration(format!(
                "schema version {} is newer than supported version {}",
                stored, target
            )));
        }
        if stored == target {
            tracing::debug!("Schema at version {}", target);
            return Ok(());
        }

        for version in (stored + 1)..=target {
            tracing::info!(
                "Migrating schema to v{} ({})",
                version,
                describe(version).unwrap_or("unknown step")
            );
            self.run_migration(version)?;
            self.set_schema_version(version)?;
        }
        Ok(())
    }

    fn migrate_to_latest(&self) -> StorageResult<()> {
        self.migrate_to(CURRENT_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        version: RefCell<u32>,
        applied: RefCell<Vec<u32>>,
    }

    impl Migratable for FakeBackend {
        fn get_schema_version(&self) -> StorageResult<u32> {
            Ok(*self.version.borrow())
        }

        fn set_schema_version(&self, version: u32) -> StorageResult<()> {
            *self.version.borrow_mut() = version;
            Ok(())
        }

        fn run_migration(&self, version: u32) -> StorageResult<()> {
            self.applied.borrow_mut().push(version);
            Ok(())
        }
    }

    #[test]
    fn test_history_ends_at_current_version() {
        assert_eq!(SCHEMA_HISTORY.last().map(|s| s.version), Some(CURRENT_VERSION));
        assert!(describe(CURRENT_VERSION).is_some());
        assert!(describe(CURRENT_VERSION + 1).is_none());
    }

    #[test]
    fn test_fresh_file_runs_every_step_once() {
        let backend = FakeBackend::default();
        backend.migrate_to_latest().unwrap();
        backend.migrate_to_latest().unwrap();

        assert_eq!(*backend.applied.borrow(), (1..=CURRENT_VERSION).collect::<Vec<_>>());
        assert_eq!(backend.get_schema_version().unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_newer_file_is_refused() {
        let backend = FakeBackend::default();
        backend.set_schema_version(CURRENT_VERSION + 1).unwrap();

        let err = backend.migrate_to_latest().unwrap_err();
        assert!(matches!(err, StorageError::Migration(_)));
        assert!(backend.applied.borrow().is_empty());
    }
}
