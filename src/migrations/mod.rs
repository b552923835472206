//! Database schema migrations.
//!
//! Every schema change is a [`Step`] tagged with the version it brings the
//! database to. Steps are plain data collected in a [`Registry`]; the
//! [`Runner`] walks the registry and applies each step inside its own
//! transaction.

use std::{collections::HashSet, fmt, sync::LazyLock};

use rusqlite::{Connection, Transaction, named_params};
use tracing::info;

use crate::{clock::Clock, error::RegistryError};

mod guard;
mod rebuild;
mod runner;
mod steps;

pub use guard::{column_exists, ensure_column, table_columns, tolerate_duplicate_column};
pub use rebuild::{ColumnCopy, TableRebuild};
pub use runner::{MigrationReport, Runner};

pub type SchemaVersion = u32;

/// A column of a table, with the SQL type used when it has to be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub table: &'static str,
    pub name: &'static str,
    pub sql_type: &'static str,
}

impl Column {
    pub const fn new(table: &'static str, name: &'static str, sql_type: &'static str) -> Self {
        Self {
            table,
            name,
            sql_type,
        }
    }

    /// Add the column without checking whether it already exists.
    pub fn add(&self, conn: &Connection) -> rusqlite::Result<()> {
        info!("adding column '{}' to '{}'", self.name, self.table);
        conn.execute(&self.add_sql(), [])?;
        Ok(())
    }

    pub(crate) fn add_sql(&self) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.table, self.name, self.sql_type
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// Run-wide values available to every operation.
pub struct StepContext<'a> {
    /// Version the database was at when the run started.
    pub from_version: SchemaVersion,
    pub clock: &'a dyn Clock,
}

pub type StepFn = fn(&Transaction, &StepContext) -> rusqlite::Result<()>;

/// One schema or data change inside a step.
#[derive(Clone, Copy)]
pub enum Operation {
    /// `ALTER TABLE .. ADD COLUMN`, failing if the column is already there.
    AddColumn(Column),
    /// Add the column only if the live table does not have it yet.
    EnsureColumn(Column),
    /// Statement without parameters.
    Execute(&'static str),
    /// Statement with a `:now` parameter bound to the clock, in epoch millis.
    ExecuteAt(&'static str),
    Rebuild(TableRebuild),
    Custom(StepFn),
}

impl Operation {
    pub fn apply(&self, tx: &Transaction, ctx: &StepContext) -> rusqlite::Result<()> {
        match self {
            Operation::AddColumn(column) => column.add(tx),
            Operation::EnsureColumn(column) => ensure_column(tx, column).map(|_| ()),
            Operation::Execute(sql) => tx.execute(sql, []).map(|_| ()),
            Operation::ExecuteAt(sql) => tx
                .execute(sql, named_params! { ":now": ctx.clock.now_millis() })
                .map(|_| ()),
            Operation::Rebuild(rebuild) => rebuild.apply(tx),
            Operation::Custom(step_fn) => step_fn(tx, ctx),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddColumn(column) => f.debug_tuple("AddColumn").field(column).finish(),
            Operation::EnsureColumn(column) => f.debug_tuple("EnsureColumn").field(column).finish(),
            Operation::Execute(sql) => f.debug_tuple("Execute").field(sql).finish(),
            Operation::ExecuteAt(sql) => f.debug_tuple("ExecuteAt").field(sql).finish(),
            Operation::Rebuild(rebuild) => f.debug_tuple("Rebuild").field(&rebuild.table).finish(),
            Operation::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A versioned, atomic unit of schema change.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub version: SchemaVersion,
    pub description: &'static str,
    /// Whether the step checks the live schema before mutating it and can be
    /// re-applied on a database that already reflects it.
    pub idempotent: bool,
    pub operations: &'static [Operation],
}

impl Step {
    pub fn apply(&self, tx: &Transaction, ctx: &StepContext) -> rusqlite::Result<()> {
        for operation in self.operations {
            operation.apply(tx, ctx)?;
        }
        Ok(())
    }
}

/// Ordered catalogue of migration steps.
#[derive(Debug, Clone)]
pub struct Registry {
    steps: Vec<Step>,
}

static BUILTIN: LazyLock<Registry> = LazyLock::new(|| {
    Registry::new(steps::STEPS.iter().copied()).expect("built-in migration catalogue is invalid")
});

impl Registry {
    /// Build a registry, sorting steps by version.
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Result<Self, RegistryError> {
        let mut steps: Vec<Step> = steps.into_iter().collect();
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if step.version == 0 {
                return Err(RegistryError::ZeroVersion);
            }
            if !seen.insert(step.version) {
                return Err(RegistryError::DuplicateVersion(step.version));
            }
        }
        steps.sort_by_key(|step| step.version);
        Ok(Self { steps })
    }

    /// Steps shipped with this crate.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    pub fn all_steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps with `from < version <= to`, in ascending order.
    pub fn steps_in(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> impl Iterator<Item = &Step> + '_ {
        self.steps
            .iter()
            .skip_while(move |step| step.version <= from)
            .take_while(move |step| step.version <= to)
    }

    pub fn latest_version(&self) -> Option<SchemaVersion> {
        self.steps.last().map(|step| step.version)
    }
}
