//! Async bridge for the synchronous SQLite pool.
//!
//! Store operations run on tokio's blocking thread pool and are bounded by a
//! per-operation deadline that covers pool checkout and the query itself.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use super::{Result, StoreError};

/// Run `f` against a pooled connection on the blocking pool.
///
/// On deadline expiry the caller gets [`StoreError::Unavailable`]; the
/// blocking task itself runs to completion in the background.
pub async fn with_connection<F, T>(
    pool: &Pool<SqliteConnectionManager>,
    deadline: Duration,
    f: F,
) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();

    let task = tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| StoreError::Pool(format!("failed to get connection: {e}")))?;
        f(&mut conn)
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(joined) => {
            joined.map_err(|e| StoreError::Unavailable(format!("task join error: {e}")))?
        }
        Err(_) => Err(StoreError::Unavailable(format!(
            "operation exceeded {}ms",
            deadline.as_millis()
        ))),
    }
}
