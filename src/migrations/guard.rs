//! Column probing used by steps that must tolerate already-present columns.

use rusqlite::Connection;
use tracing::{debug, warn};

use super::Column;

/// Names of the columns of `table`, in declaration order.
///
/// A missing table yields an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    Ok(table_columns(conn, table)?
        .iter()
        .any(|name| name.eq_ignore_ascii_case(column)))
}

/// Add `column` unless the live table already has it.
///
/// Returns whether the column was added.
pub fn ensure_column(conn: &Connection, column: &Column) -> rusqlite::Result<bool> {
    if column_exists(conn, column.table, column.name)? {
        debug!("column '{}' already present, skipping", column);
        return Ok(false);
    }
    column.add(conn)?;
    Ok(true)
}

/// Turn a "duplicate column name" failure of an `ADD COLUMN` into a skip.
///
/// Any other outcome is passed through unchanged.
pub fn tolerate_duplicate_column(
    result: rusqlite::Result<usize>,
    column: &Column,
) -> rusqlite::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_column(&err) => {
            warn!("column '{}' was added twice, keeping the existing one", column);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            message.contains("duplicate column name")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE files (_id INTEGER PRIMARY KEY, Path TEXT)")
            .unwrap();
        conn
    }

    #[test]
    fn probes_are_case_insensitive() {
        let conn = conn();
        assert!(column_exists(&conn, "files", "path").unwrap());
        assert!(column_exists(&conn, "files", "_ID").unwrap());
        assert!(!column_exists(&conn, "files", "etag").unwrap());
        assert!(!column_exists(&conn, "missing", "path").unwrap());
    }

    #[test]
    fn ensure_column_adds_once() {
        let conn = conn();
        let etag = Column::new("files", "etag", "TEXT");

        assert!(ensure_column(&conn, &etag).unwrap());
        assert!(!ensure_column(&conn, &etag).unwrap());
        assert_eq!(table_columns(&conn, "files").unwrap(), vec!["_id", "Path", "etag"]);
    }

    #[test]
    fn duplicate_column_failure_is_tolerated() {
        let conn = conn();
        let path = Column::new("files", "path", "TEXT");

        let result = conn.execute(&path.add_sql(), []);
        assert!(result.is_err());
        tolerate_duplicate_column(result, &path).unwrap();
        assert_eq!(table_columns(&conn, "files").unwrap().len(), 2);
    }

    #[test]
    fn other_failures_are_not_tolerated() {
        let conn = conn();
        let column = Column::new("missing", "path", "TEXT");

        let result = conn.execute(&column.add_sql(), []);
        assert!(tolerate_duplicate_column(result, &column).is_err());
    }
}
