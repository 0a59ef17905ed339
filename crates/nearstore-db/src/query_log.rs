//! Database operations for the append-only `query_log` table.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use nearstore_core::{LogEntry, LogStatus, QueryLog, QueryLogError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Upper bound on rows returned by [`list_query_log`].
pub const MAX_LIST_LIMIT: i64 = 500;

/// A row from the `query_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryLogRow {
    pub id: i64,
    pub public_id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub utc_offset_secs: i32,
    pub query: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl QueryLogRow {
    /// `logged_at` rendered in the offset the entry was written with.
    #[must_use]
    pub fn local_logged_at(&self) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix());
        self.logged_at.with_timezone(&offset)
    }

    /// # Errors
    ///
    /// Returns [`QueryLogError::UnknownStatus`] if the stored tag is not recognized.
    pub fn log_status(&self) -> Result<LogStatus, QueryLogError> {
        self.status.parse()
    }
}

/// Appends one entry and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn append_query_log(pool: &PgPool, entry: &LogEntry) -> Result<QueryLogRow, DbError> {
    let row = sqlx::query_as::<_, QueryLogRow>(
        "INSERT INTO query_log (public_id, logged_at, utc_offset_secs, query, status, message) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, public_id, logged_at, utc_offset_secs, query, status, message, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(entry.logged_at.with_timezone(&Utc))
    .bind(entry.logged_at.offset().local_minus_utc())
    .bind(&entry.query)
    .bind(entry.status.as_str())
    .bind(&entry.message)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Most recent entries first. `limit` is clamped to `1..=MAX_LIST_LIMIT`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_query_log(pool: &PgPool, limit: i64) -> Result<Vec<QueryLogRow>, DbError> {
    let rows = sqlx::query_as::<_, QueryLogRow>(
        "SELECT id, public_id, logged_at, utc_offset_secs, query, status, message, created_at \
         FROM query_log \
         ORDER BY logged_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit.clamp(1, MAX_LIST_LIMIT))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// [`QueryLog`] backed by the `query_log` table.
#[derive(Debug, Clone)]
pub struct PgQueryLog {
    pool: PgPool,
}

impl PgQueryLog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl QueryLog for PgQueryLog {
    async fn append(&self, entry: LogEntry) -> Result<(), QueryLogError> {
        append_query_log(&self.pool, &entry)
            .await
            .map(|row| tracing::debug!(id = row.id, status = %row.status, "query log entry stored"))
            .map_err(|e| QueryLogError::Store(e.to_string()))
    }
}
