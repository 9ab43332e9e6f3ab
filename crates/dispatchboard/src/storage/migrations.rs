//! Schema versioning for the slot database.
//!
//! The version lives in the `metadata` table. Opening a database applies
//! every missing step in one transaction, so a failed upgrade leaves the
//! file at its previous version.

use std::cmp::Ordering;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, CREATE_SLOTS_TABLE};

/// The schema version this build writes.
pub const CURRENT_VERSION: i32 = 1;

/// Metadata key holding the schema version.
const VERSION_KEY: &str = "schema_version";

/// Upgrade steps. `STEPS[n]` takes a database from version `n` to `n + 1`.
const STEPS: &[&[&str]] = &[
    // 0 -> 1: one row per slot
    &[CREATE_SLOTS_TABLE],
];

/// Bring the database at `conn` up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if the database was written by a newer schema, carries
/// an unreadable version, or a step fails.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = schema_version(conn)?;
    match version.cmp(&CURRENT_VERSION) {
        Ordering::Equal => Ok(()),
        Ordering::Less => migrate(conn, version),
        Ordering::Greater => Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        }),
    }
}

/// The stored schema version, 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn store_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn migrate(conn: &mut Connection, from: i32) -> Result<()> {
    let tx = conn.transaction()?;

    for version in from..CURRENT_VERSION {
        let step = usize::try_from(version)
            .ok()
            .and_then(|index| STEPS.get(index))
            .ok_or_else(|| Error::DatabaseMigration {
                message: format!("no migration from schema version {version}"),
            })?;
        for statement in *step {
            tx.execute(statement, [])?;
        }
        debug!("Applied schema step {} -> {}", version, version + 1);
    }

    store_version(&tx, CURRENT_VERSION)?;
    tx.commit()?;
    info!("Database schema upgraded from version {} to {}", from, CURRENT_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_steps_match_current_version() {
        assert_eq!(STEPS.len(), usize::try_from(CURRENT_VERSION).unwrap());
    }

    #[test]
    fn test_fresh_database_is_upgraded() {
        let mut conn = fresh();
        initialize_schema(&mut conn).unwrap();

        assert!(table_exists(&conn, "slots"));
        assert!(table_exists(&conn, "metadata"));
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut conn = fresh();
        initialize_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO slots (key, value) VALUES ('incidents', '[]')",
            [],
        )
        .unwrap();

        initialize_schema(&mut conn).unwrap();

        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_version_defaults_to_zero() {
        let conn = fresh();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = fresh();
        initialize_schema(&mut conn).unwrap();
        store_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&mut conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_unreadable_version_rejected() {
        let mut conn = fresh();
        initialize_schema(&mut conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'abc' WHERE key = ?1",
            [VERSION_KEY],
        )
        .unwrap();

        let err = initialize_schema(&mut conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_negative_version_has_no_step() {
        let mut conn = fresh();
        conn.execute(CREATE_METADATA_TABLE, []).unwrap();
        store_version(&conn, -1).unwrap();

        let err = initialize_schema(&mut conn).unwrap_err();
        assert!(err.to_string().contains("no migration from schema version -1"));
        assert!(!table_exists(&conn, "slots"));
    }
}
