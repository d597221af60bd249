//! SQLite persistence for submissions.
//!
//! [`SubmissionStore`] owns every record. It wraps an r2d2 pool, runs
//! migrations at open, and exposes async operations that execute on the
//! blocking pool via [`async_wrapper::with_connection`].

pub mod async_wrapper;
pub mod connection;
pub mod migrations;
pub mod query;
pub mod transactions;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::submission::{NewSubmission, Submission, SubmissionPatch, SubmissionStatus};

pub use async_wrapper::with_connection;
pub use query::{
    Page, PageRequest, Pagination, SortDirection, SortField, StatusSummary, SubmissionQuery,
};
use transactions::execute_in_transaction;

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

const MILLIS_PER_DAY: i64 = 86_400_000;

const SELECT_COLUMNS: &str =
    "SELECT id, name, email, phone, message, source, status, created_at, updated_at FROM submissions";

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Submission conflicts with an existing record")]
    Conflict,
}

#[derive(Clone)]
pub struct SubmissionStore {
    pool: Pool<SqliteConnectionManager>,
    op_timeout: Duration,
}

impl SubmissionStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub fn open(path: &Path, cfg: &DatabaseConfig) -> Result<Self> {
        let pool = connection::initialize_pool(path, cfg)?;
        let store = Self {
            pool,
            op_timeout: Duration::from_millis(cfg.op_timeout_ms),
        };
        store.prepare_schema(cfg.strict_dedup)?;
        tracing::info!(
            path = %path.display(),
            pool_size = cfg.pool_size,
            strict_dedup = cfg.strict_dedup,
            "Submission store opened"
        );
        Ok(store)
    }

    /// Private in-memory store, used by tests and ephemeral runs.
    pub fn open_in_memory(strict_dedup: bool) -> Result<Self> {
        let store = Self {
            pool: connection::initialize_memory_pool()?,
            op_timeout: Duration::from_secs(10),
        };
        store.prepare_schema(strict_dedup)?;
        Ok(store)
    }

    fn prepare_schema(&self, strict_dedup: bool) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| StoreError::Pool(format!("failed to get connection: {e}")))?;
        migrations::migrate_to_latest(&mut conn)?;
        migrations::apply_dedup_index(&conn, strict_dedup)
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        with_connection(&self.pool, self.op_timeout, f).await
    }

    /// Insert a new submission with status `new`.
    pub async fn create(
        &self,
        new: NewSubmission,
        source: String,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let now = truncate_to_millis(now);
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            message: new.message,
            source,
            status: SubmissionStatus::New,
            created_at: now,
            updated_at: now,
        };

        let row = submission.clone();
        self.run(move |conn| {
            let created_ms = row.created_at.timestamp_millis();
            conn.execute(
                "INSERT INTO submissions
                     (id, name, email, phone, message, source, status, created_at, updated_at, day_bucket)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    row.id,
                    row.name,
                    row.email,
                    row.phone,
                    row.message,
                    row.source,
                    row.status,
                    created_ms,
                    row.updated_at.timestamp_millis(),
                    created_ms.div_euclid(MILLIS_PER_DAY),
                ],
            )
            .map_err(map_write_error)?;
            Ok(())
        })
        .await?;

        Ok(submission)
    }

    /// Most recent submission for `email` created strictly after `since`.
    pub async fn find_recent_by_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Submission>> {
        let email = email.to_string();
        let since_ms = since.timestamp_millis();
        self.run(move |conn| {
            let sql = format!(
                "{SELECT_COLUMNS} WHERE email = ?1 AND created_at > ?2
                 ORDER BY created_at DESC LIMIT 1"
            );
            Ok(conn
                .query_row(&sql, params![email, since_ms], submission_from_row)
                .optional()?)
        })
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Submission>> {
        let id = id.to_string();
        self.run(move |conn| fetch(conn, &id)).await
    }

    /// Apply `patch` and bump `updated_at`. Returns `None` if `id` is absent.
    pub async fn update(
        &self,
        id: &str,
        patch: SubmissionPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Submission>> {
        let id = id.to_string();
        let now = truncate_to_millis(now);
        self.run(move |conn| {
            execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
                let Some(mut current) = fetch(tx, &id)? else {
                    return Ok(None);
                };
                if let Some(name) = patch.name {
                    current.name = name;
                }
                if let Some(email) = patch.email {
                    current.email = email;
                }
                if let Some(phone) = patch.phone {
                    current.phone = phone;
                }
                if let Some(message) = patch.message {
                    current.message = message;
                }
                if let Some(status) = patch.status {
                    current.status = status;
                }
                current.updated_at = now;

                tx.execute(
                    "UPDATE submissions
                     SET name = ?2, email = ?3, phone = ?4, message = ?5, status = ?6, updated_at = ?7
                     WHERE id = ?1",
                    params![
                        current.id,
                        current.name,
                        current.email,
                        current.phone,
                        current.message,
                        current.status,
                        now.timestamp_millis(),
                    ],
                )
                .map_err(map_write_error)?;
                Ok(Some(current))
            })
        })
        .await
    }

    /// Permanently remove a submission. Returns whether a row was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run(move |conn| {
            let removed = conn.execute("DELETE FROM submissions WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
    }

    /// One page of matching submissions with the total match count.
    pub async fn list(&self, query: SubmissionQuery, page: PageRequest) -> Result<Page<Submission>> {
        self.run(move |conn| {
            let (where_sql, mut values) = query.where_clause();

            let count_sql = format!("SELECT COUNT(*) FROM submissions{where_sql}");
            let total: i64 =
                conn.query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

            let sql = format!(
                "{SELECT_COLUMNS}{where_sql}{} LIMIT ? OFFSET ?",
                query.order_clause()
            );
            values.push(rusqlite::types::Value::Integer(i64::from(page.limit)));
            values.push(rusqlite::types::Value::Integer(page.offset()));
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params_from_iter(values.iter()), submission_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Page {
                items,
                total: u64::try_from(total).unwrap_or_default(),
                request: page,
            })
        })
        .await
    }

    /// Every matching submission, unpaged.
    pub async fn list_all(&self, query: SubmissionQuery) -> Result<Vec<Submission>> {
        self.run(move |conn| {
            let (where_sql, values) = query.where_clause();
            let sql = format!("{SELECT_COLUMNS}{where_sql}{}", query.order_clause());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), submission_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// The `limit` most recently created submissions, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Submission>> {
        self.run(move |conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit], submission_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// Counts by status, plus how many were created at or after `recent_since`.
    pub async fn status_summary(&self, recent_since: DateTime<Utc>) -> Result<StatusSummary> {
        let since_ms = recent_since.timestamp_millis();
        self.run(move |conn| {
            let mut summary = StatusSummary::default();
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM submissions GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, SubmissionStatus>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                summary.add(status, u64::try_from(count).unwrap_or_default());
            }

            let recent: i64 = conn.query_row(
                "SELECT COUNT(*) FROM submissions WHERE created_at >= ?1",
                params![since_ms],
                |row| row.get(0),
            )?;
            summary.recent = u64::try_from(recent).unwrap_or_default();
            Ok(summary)
        })
        .await
    }
}

fn fetch(conn: &Connection, id: &str) -> Result<Option<Submission>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], submission_from_row)
        .optional()?)
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        message: row.get(4)?,
        source: row.get(5)?,
        status: row.get(6)?,
        created_at: millis_column(row, 7)?,
        updated_at: millis_column(row, 8)?,
    })
}

fn millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn map_write_error(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => StoreError::Conflict,
        _ => StoreError::Sqlite(err),
    }
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

impl ToSql for SubmissionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SubmissionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        SubmissionStatus::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown submission status {raw:?}").into()))
    }
}
