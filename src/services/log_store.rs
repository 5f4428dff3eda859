use crate::error::Result;
use crate::models::{LogEntry, LogLevel};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Per-server cap; oldest entries are evicted on overflow.
const MAX_ENTRIES_PER_SERVER: i64 = 200;

/// Append-only, size-bounded activity log. Written only as a side effect of
/// registry and health-check operations, read by the logs endpoint.
#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, server_id: &str, level: LogLevel, message: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::append_in(&mut conn, server_id, level, message).await?;
        Ok(())
    }

    /// Append variant usable inside a caller-owned transaction, so a record
    /// insert and its initial log entry commit together.
    pub(crate) async fn append_in(
        conn: &mut SqliteConnection,
        server_id: &str,
        level: LogLevel,
        message: &str,
    ) -> std::result::Result<(), sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO logs (id, server_id, timestamp, level, message)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(server_id)
        .bind(timestamp)
        .bind(level)
        .bind(message)
        .execute(&mut *conn)
        .await?;

        // Restore the cap; seq order is insertion order even when timestamps
        // collide.
        sqlx::query(
            r#"
            DELETE FROM logs
            WHERE seq IN (
                SELECT seq FROM logs
                WHERE server_id = ?
                ORDER BY seq DESC
                LIMIT -1 OFFSET ?
            )
            "#,
        )
        .bind(server_id)
        .bind(MAX_ENTRIES_PER_SERVER)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Newest-first entries for one server. An id with no history yields an
    /// empty sequence, not an error.
    pub async fn entries(&self, server_id: &str) -> Result<Vec<LogEntry>> {
        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT id, timestamp, level, message
            FROM logs
            WHERE server_id = ?
            ORDER BY seq DESC
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn clear(&self, server_id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::clear_in(&mut conn, server_id).await?;
        Ok(())
    }

    pub(crate) async fn clear_in(
        conn: &mut SqliteConnection,
        server_id: &str,
    ) -> std::result::Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM logs WHERE server_id = ?")
            .bind(server_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
