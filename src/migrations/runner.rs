use rusqlite::{Connection, Transaction};
use tracing::{error, info, warn};

use super::{Registry, SchemaVersion, Step, StepContext};
use crate::{clock::Clock, error::MigrationError};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    applied: Vec<SchemaVersion>,
}

impl MigrationReport {
    /// Versions committed by the run, in order.
    pub fn applied(&self) -> &[SchemaVersion] {
        &self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn last_applied(&self) -> Option<SchemaVersion> {
        self.applied.last().copied()
    }
}

/// Applies the registry's steps for a version range, one transaction per step.
pub struct Runner<'a> {
    registry: &'a Registry,
    clock: &'a dyn Clock,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a Registry, clock: &'a dyn Clock) -> Self {
        Self { registry, clock }
    }

    /// Bring `conn` from schema version `from` to `to`.
    ///
    /// The caller must hold the only connection writing to the database for
    /// the duration of the call.
    pub fn run(
        &self,
        conn: &mut Connection,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> Result<MigrationReport, MigrationError> {
        self.run_with(conn, from, to, |_, _| Ok(()))
    }

    /// Like [`Runner::run`], calling `on_commit` inside each step's
    /// transaction right before it commits.
    ///
    /// Whatever `on_commit` writes lands atomically with the step. An error
    /// from it rolls the step back and fails the run.
    pub fn run_with<F>(
        &self,
        conn: &mut Connection,
        from: SchemaVersion,
        to: SchemaVersion,
        mut on_commit: F,
    ) -> Result<MigrationReport, MigrationError>
    where
        F: FnMut(&Transaction<'_>, SchemaVersion) -> rusqlite::Result<()>,
    {
        if from > to {
            error!("refusing to downgrade schema from version {} to {}", from, to);
            return Err(MigrationError::UnsupportedDirection { from, to });
        }

        let ctx = StepContext {
            from_version: from,
            clock: self.clock,
        };
        let mut applied = Vec::new();

        for step in self.registry.steps_in(from, to) {
            match apply_step(conn, step, &ctx, &mut on_commit) {
                Ok(()) => applied.push(step.version),
                Err(source) => {
                    error!(
                        "migration to version {} ({}) failed: {}",
                        step.version, step.description, source
                    );
                    return Err(MigrationError::StepFailed {
                        version: step.version,
                        description: step.description,
                        applied,
                        source,
                    });
                }
            }
        }

        if applied.is_empty() {
            info!("no migration between version {} and {}", from, to);
        } else {
            info!("schema migrated from version {} to {}", from, to);
        }

        Ok(MigrationReport { from, to, applied })
    }
}

fn apply_step<F>(
    conn: &mut Connection,
    step: &Step,
    ctx: &StepContext,
    on_commit: &mut F,
) -> rusqlite::Result<()>
where
    F: FnMut(&Transaction<'_>, SchemaVersion) -> rusqlite::Result<()>,
{
    info!("migrating to version {}: {}", step.version, step.description);

    let tx = conn.transaction()?;
    match step.apply(&tx, ctx).and_then(|()| on_commit(&tx, step.version)) {
        Ok(()) => tx.commit(),
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    "rollback of version {} failed: {}",
                    step.version, rollback_err
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        migrations::{Column, Operation, column_exists},
    };

    fn fail_when_blocked(tx: &Transaction, _ctx: &StepContext) -> rusqlite::Result<()> {
        tx.execute("INSERT INTO log (entry) VALUES ('two')", [])?;
        let blocked: i64 = tx.query_row("SELECT COUNT(*) FROM block", [], |row| row.get(0))?;
        if blocked > 0 {
            tx.execute("INSERT INTO missing_table VALUES (1)", [])?;
        }
        Ok(())
    }

    const ADD_ONE: &[Operation] = &[Operation::AddColumn(Column::new("items", "one", "TEXT"))];
    const ADD_TWO: &[Operation] = &[
        Operation::AddColumn(Column::new("items", "two", "TEXT")),
        Operation::Custom(fail_when_blocked),
    ];
    const STAMP: &[Operation] = &[
        Operation::AddColumn(Column::new("items", "stamped", "INTEGER")),
        Operation::ExecuteAt("UPDATE items SET stamped = :now"),
    ];

    fn registry() -> Registry {
        Registry::new([
            Step {
                version: 1,
                description: "add one",
                idempotent: false,
                operations: ADD_ONE,
            },
            Step {
                version: 2,
                description: "add two",
                idempotent: false,
                operations: ADD_TWO,
            },
            Step {
                version: 4,
                description: "stamp",
                idempotent: false,
                operations: STAMP,
            },
        ])
        .unwrap()
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (_id INTEGER PRIMARY KEY);
             CREATE TABLE log (entry TEXT);
             CREATE TABLE block (x INTEGER);
             INSERT INTO items (_id) VALUES (1);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn applies_steps_in_range() {
        let registry = registry();
        let clock = FixedClock(42);
        let mut conn = conn();

        let report = Runner::new(&registry, &clock).run(&mut conn, 0, 4).unwrap();
        assert_eq!(report.applied(), &[1, 2, 4]);
        assert_eq!(report.last_applied(), Some(4));

        let stamped: i64 = conn
            .query_row("SELECT stamped FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stamped, 42);
    }

    #[test]
    fn range_between_steps_is_empty() {
        let registry = registry();
        let clock = FixedClock(0);
        let mut conn = conn();

        let report = Runner::new(&registry, &clock).run(&mut conn, 2, 3).unwrap();
        assert!(report.is_empty());
        assert!(!column_exists(&conn, "items", "stamped").unwrap());
    }

    #[test]
    fn downgrade_is_rejected() {
        let registry = registry();
        let clock = FixedClock(0);
        let mut conn = conn();

        let err = Runner::new(&registry, &clock)
            .run(&mut conn, 4, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UnsupportedDirection { from: 4, to: 1 }
        ));
        assert!(!column_exists(&conn, "items", "one").unwrap());
    }

    #[test]
    fn failed_step_is_rolled_back_and_earlier_steps_kept() {
        let registry = registry();
        let clock = FixedClock(0);
        let mut conn = conn();
        conn.execute("INSERT INTO block VALUES (1)", []).unwrap();

        let err = Runner::new(&registry, &clock)
            .run(&mut conn, 0, 4)
            .unwrap_err();
        match &err {
            MigrationError::StepFailed {
                version, applied, ..
            } => {
                assert_eq!(*version, 2);
                assert_eq!(applied, &vec![1]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.last_committed(), Some(1));

        assert!(column_exists(&conn, "items", "one").unwrap());
        assert!(!column_exists(&conn, "items", "two").unwrap());
        assert!(!column_exists(&conn, "items", "stamped").unwrap());
        let logged: i64 = conn
            .query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(logged, 0);
    }

    #[test]
    fn commit_hook_runs_inside_each_step() {
        let registry = registry();
        let clock = FixedClock(0);
        let mut conn = conn();
        conn.execute_batch("CREATE TABLE versions (v INTEGER)").unwrap();

        let report = Runner::new(&registry, &clock)
            .run_with(&mut conn, 0, 4, |tx, version| {
                tx.execute("INSERT INTO versions (v) VALUES (?1)", [version])?;
                Ok(())
            })
            .unwrap();
        assert_eq!(report.applied(), &[1, 2, 4]);

        let recorded: Vec<u32> = conn
            .prepare("SELECT v FROM versions ORDER BY rowid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(recorded, vec![1, 2, 4]);
    }

    #[test]
    fn failing_commit_hook_rolls_the_step_back() {
        let registry = registry();
        let clock = FixedClock(0);
        let mut conn = conn();

        let err = Runner::new(&registry, &clock)
            .run_with(&mut conn, 0, 4, |tx, version| {
                if version == 2 {
                    tx.execute("INSERT INTO missing_table VALUES (1)", [])?;
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.last_committed(), Some(1));
        assert!(column_exists(&conn, "items", "one").unwrap());
        assert!(!column_exists(&conn, "items", "two").unwrap());
    }

    #[test]
    fn resumes_from_last_committed_version() {
        let registry = registry();
        let clock = FixedClock(7);
        let mut conn = conn();
        conn.execute("INSERT INTO block VALUES (1)", []).unwrap();

        let runner = Runner::new(&registry, &clock);
        let last = runner.run(&mut conn, 0, 4).unwrap_err().last_committed();
        conn.execute("DELETE FROM block", []).unwrap();

        let report = runner.run(&mut conn, last.unwrap_or(0), 4).unwrap();
        assert_eq!(report.applied(), &[2, 4]);
        assert!(column_exists(&conn, "items", "two").unwrap());
        assert!(column_exists(&conn, "items", "stamped").unwrap());
    }
}
