//! Opening SQLite connections for the record store.

use std::time::Duration;

use rusqlite::Connection;

use crate::config::DatabaseTarget;
use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open and configure a connection to `target`.
pub fn open(target: &DatabaseTarget) -> Result<Connection, StoreError> {
    let conn = match target {
        DatabaseTarget::InMemory => Connection::open_in_memory()?,
        DatabaseTarget::File(path) => Connection::open(path)?,
    };
    configure(&conn)?;
    tracing::debug!(database = ?target, "opened database connection");
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<(), StoreError> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory() {
        let conn = open(&DatabaseTarget::InMemory).expect("open");
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).expect("query");
        assert_eq!(one, 1);
    }

    #[test]
    fn unreachable_path_is_a_connection_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = DatabaseTarget::File(dir.path().join("missing").join("users.db"));
        let err = open(&target).expect_err("parent directory does not exist");
        assert!(err.is_connection(), "unexpected error: {err:?}");
    }
}
