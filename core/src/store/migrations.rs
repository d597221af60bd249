//! Schema versioning and migrations
//!
//! Forward-only; the applied version is tracked in `PRAGMA user_version`.

use rusqlite::Connection;

use super::{Result, StoreError};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const MIGRATION_V1: &str = "
CREATE TABLE IF NOT EXISTS submissions (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    phone       TEXT NOT NULL,
    message     TEXT NOT NULL,
    source      TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'contacted', 'converted', 'lost')),
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    day_bucket  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_email_created
    ON submissions(email, created_at);
CREATE INDEX IF NOT EXISTS idx_submissions_status_created
    ON submissions(status, created_at);
CREATE INDEX IF NOT EXISTS idx_submissions_created
    ON submissions(created_at);
";

/// Apply all pending migrations.
pub fn migrate_to_latest(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    if current < 1 {
        let tx = conn.transaction()?;
        tx.execute_batch(MIGRATION_V1)
            .map_err(|e| StoreError::Migration(format!("v1: {e}")))?;
        tx.pragma_update(None, "user_version", 1)?;
        tx.commit()?;
        tracing::info!(version = 1, "Applied submissions schema migration");
    }

    Ok(())
}

/// Install or remove the one-per-email-per-day unique index.
pub fn apply_dedup_index(conn: &Connection, strict: bool) -> Result<()> {
    let sql = if strict {
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_submissions_email_day
             ON submissions(email, day_bucket)"
    } else {
        "DROP INDEX IF EXISTS idx_submissions_email_day"
    };
    conn.execute_batch(sql)
        .map_err(|e| StoreError::Migration(format!("dedup index: {e}")))
}

pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        migrate_to_latest(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Second run is a no-op.
        migrate_to_latest(&mut conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'submissions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let err = migrate_to_latest(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration(_)));
    }

    #[test]
    fn status_check_constraint() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_to_latest(&mut conn).unwrap();
        let result = conn.execute(
            "INSERT INTO submissions
                 (id, name, email, phone, message, source, status, created_at, updated_at, day_bucket)
             VALUES ('a', 'n', 'e', 'p', 'm', 's', 'archived', 0, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn dedup_index_toggles() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_to_latest(&mut conn).unwrap();
        let has_index = |conn: &Connection| -> i64 {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'idx_submissions_email_day'",
                [],
                |row| row.get(0),
            )
            .unwrap()
        };

        apply_dedup_index(&conn, true).unwrap();
        assert_eq!(has_index(&conn), 1);
        apply_dedup_index(&conn, false).unwrap();
        assert_eq!(has_index(&conn), 0);
    }
}
