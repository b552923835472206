//! SQLite handle that persists the schema version and drives upgrades.

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::{
    LATEST_VERSION,
    clock::Clock,
    error::Error,
    migrations::{MigrationReport, Registry, Runner, SchemaVersion},
};

pub mod schema;

/// Database whose schema version is stored in `PRAGMA user_version`.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        info!("opening SQLite database at {}", path.display());
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    pub fn schema_version(&self) -> Result<SchemaVersion, Error> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        SchemaVersion::try_from(version).map_err(|_| Error::InvalidSchemaVersion(version))
    }

    fn set_schema_version(&self, version: SchemaVersion) -> Result<(), Error> {
        write_schema_version(&self.conn, version)?;
        Ok(())
    }

    fn is_empty(&self) -> Result<bool, Error> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        Ok(tables == 0)
    }

    /// Upgrade to the newest version this crate knows about.
    pub fn upgrade(&mut self, clock: &dyn Clock) -> Result<MigrationReport, Error> {
        self.upgrade_to(LATEST_VERSION, clock)
    }

    /// Upgrade from the persisted version to `target`.
    ///
    /// An empty database is first given the baseline schema. Each step
    /// stores its version in the same transaction it commits in, so after a
    /// failure or a crash calling this again resumes from the last committed
    /// step.
    pub fn upgrade_to(
        &mut self,
        target: SchemaVersion,
        clock: &dyn Clock,
    ) -> Result<MigrationReport, Error> {
        let mut current = self.schema_version()?;

        if current == 0 && self.is_empty()? {
            info!("empty database, creating baseline schema");
            let tx = self.conn.transaction()?;
            tx.execute_batch(schema::BASELINE_SCHEMA)?;
            write_schema_version(&tx, schema::BASELINE_VERSION)?;
            tx.commit()?;
            current = schema::BASELINE_VERSION;
        }

        info!("database at schema version {}, target {}", current, target);

        let runner = Runner::new(Registry::builtin(), clock);
        let result = runner.run_with(&mut self.conn, current, target, |tx, version| {
            write_schema_version(tx, version)
        });
        match result {
            Ok(report) => {
                // Targets past the last step, or between two steps.
                if target > report.last_applied().unwrap_or(current) {
                    self.set_schema_version(target)?;
                }
                Ok(report)
            }
            Err(err) => {
                let version = err.last_committed().unwrap_or(current);
                warn!("upgrade stopped, database left at version {}", version);
                Err(err.into())
            }
        }
    }
}

/// Store `version` in `PRAGMA user_version`.
///
/// Inside a transaction the write commits or rolls back with it.
pub fn write_schema_version(conn: &Connection, version: SchemaVersion) -> rusqlite::Result<()> {
    // PRAGMA arguments cannot be bound.
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))?;
    debug!("schema version set to {}", version);
    Ok(())
}
