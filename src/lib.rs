//! Versioned schema upgrades for legacy SQLite file databases.
//!
//! A database at some schema version is brought to a newer one by applying,
//! in order, every registered [`Step`] whose version lies in the half-open
//! range `(from, to]`. Each step runs in its own transaction, so a failure
//! leaves the database at the last step that committed.
//!
//! ```no_run
//! use legacy_migrations::{Database, SystemClock};
//!
//! let mut db = Database::open("filelist.db")?;
//! let report = db.upgrade(&SystemClock)?;
//! println!("applied {:?}", report.applied());
//! # Ok::<(), legacy_migrations::Error>(())
//! ```

pub mod clock;
pub mod db;
pub mod error;
pub mod migrations;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::Database;
pub use error::{Error, MigrationError, RegistryError};
pub use migrations::{MigrationReport, Registry, Runner, SchemaVersion, Step};

/// Newest schema version known to the built-in registry.
pub const LATEST_VERSION: SchemaVersion = 64;
