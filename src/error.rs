use thiserror::Error;

use crate::migrations::SchemaVersion;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Invalid schema version stored in database: {0}")]
    InvalidSchemaVersion(i64),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a migration run.
///
/// Versions committed before the failing step stay applied; `applied` lists
/// them so the caller can persist the last one and resume from there.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("cannot migrate schema down from version {from} to {to}")]
    UnsupportedDirection {
        from: SchemaVersion,
        to: SchemaVersion,
    },

    #[error("migration to version {version} ({description}) failed: {source}")]
    StepFailed {
        version: SchemaVersion,
        description: &'static str,
        applied: Vec<SchemaVersion>,
        #[source]
        source: rusqlite::Error,
    },
}

impl MigrationError {
    /// Highest version committed by the run before it stopped, if any.
    pub fn last_committed(&self) -> Option<SchemaVersion> {
        match self {
            MigrationError::UnsupportedDirection { .. } => None,
            MigrationError::StepFailed { applied, .. } => applied.last().copied(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("migration version {0} is registered more than once")]
    DuplicateVersion(SchemaVersion),

    #[error("migration versions must be positive")]
    ZeroVersion,
}
