//! Connection pooling and pragma configuration

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use super::{Result, StoreError};
use crate::config::DatabaseConfig;

/// Build a pool over the database file at `path`, creating parent
/// directories as needed.
pub fn initialize_pool(path: &Path, cfg: &DatabaseConfig) -> Result<Pool<SqliteConnectionManager>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            StoreError::Pool(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let busy_timeout = Duration::from_millis(cfg.busy_timeout_ms);
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| apply_pragmas(conn, busy_timeout));

    Pool::builder()
        .max_size(cfg.pool_size)
        .connection_timeout(busy_timeout.max(Duration::from_millis(1)))
        .build(manager)
        .map_err(|e| StoreError::Pool(format!("failed to build pool: {e}")))
}

/// Single-connection pool over a private in-memory database.
///
/// Every SQLite `:memory:` connection is its own database, so the pool is
/// pinned to one connection that is never recycled.
pub fn initialize_memory_pool() -> Result<Pool<SqliteConnectionManager>> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| apply_pragmas(conn, Duration::from_millis(1_000)));

    Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)
        .map_err(|e| StoreError::Pool(format!("failed to build pool: {e}")))
}

fn apply_pragmas(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    // journal_mode reports the resulting mode as a row.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
}
