//! Column rename/drop for engines that cannot alter a column in place.
//!
//! The live table is renamed out of the way, recreated under its original
//! name with the final column set, filled from the old table with an explicit
//! column list, and the old table is dropped.

use rusqlite::Connection;
use tracing::info;

use super::guard::table_columns;

/// Where a column of the rebuilt table takes its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCopy {
    pub target: &'static str,
    pub source: &'static str,
}

impl ColumnCopy {
    pub const fn same(name: &'static str) -> Self {
        Self {
            target: name,
            source: name,
        }
    }

    pub const fn renamed(source: &'static str, target: &'static str) -> Self {
        Self { target, source }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableRebuild {
    pub table: &'static str,
    pub temp_table: &'static str,
    /// `CREATE TABLE` statement for `table` with its final column set.
    pub create_sql: &'static str,
    /// Every column that survives the rebuild.
    pub columns: &'static [ColumnCopy],
}

impl TableRebuild {
    pub fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        if self.already_rebuilt(conn)? {
            info!("table '{}' already has its final columns, skipping rebuild", self.table);
            return Ok(());
        }

        info!("rebuilding table '{}'", self.table);
        conn.execute(
            &format!("ALTER TABLE {} RENAME TO {}", self.table, self.temp_table),
            [],
        )?;
        conn.execute(self.create_sql, [])?;
        let copied = conn.execute(&self.copy_sql(), [])?;
        conn.execute(&format!("DROP TABLE {}", self.temp_table), [])?;
        info!("copied {} rows into rebuilt table '{}'", copied, self.table);
        Ok(())
    }

    pub(crate) fn copy_sql(&self) -> String {
        let targets: Vec<&str> = self.columns.iter().map(|c| c.target).collect();
        let sources: Vec<&str> = self.columns.iter().map(|c| c.source).collect();
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            self.table,
            targets.join(", "),
            sources.join(", "),
            self.temp_table
        )
    }

    /// True when the live table carries exactly the target columns, so the
    /// step is being replayed on an already-migrated database.
    fn already_rebuilt(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let live = table_columns(conn, self.table)?;
        Ok(live.len() == self.columns.len()
            && self
                .columns
                .iter()
                .all(|c| live.iter().any(|name| name.eq_ignore_ascii_case(c.target))))
    }
}
