use crate::error::{AppError, Result};
use crate::models::{CheckStatus, LogLevel, ServerDraft, ServerRecord, TransportType};
use crate::services::log_store::ActivityLog;
use crate::services::secrets::Secret;
use crate::services::vault::CredentialVault;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Columns of a dashboard-facing record. `auth_configured` is derived from
/// the vault rather than stored on the row.
const RECORD_COLUMNS: &str = r#"
    s.id, s.name, s.endpoint, s.transport, s.created_at,
    s.last_check_at, s.last_check_status, s.last_check_latency_ms, s.last_check_detail,
    EXISTS (SELECT 1 FROM credentials c WHERE c.server_id = s.id) AS auth_configured
"#;

/// The authoritative server registry. Owns record lifecycle, is the only
/// writer of last-check fields, and drives the vault and activity log as
/// side effects so callers never touch them out of step with the records.
#[derive(Clone)]
pub struct ServerRegistry {
    pool: SqlitePool,
    vault: CredentialVault,
    logs: ActivityLog,
}

impl ServerRegistry {
    pub fn new(pool: SqlitePool, vault: CredentialVault, logs: ActivityLog) -> Self {
        Self { pool, vault, logs }
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.logs
    }

    fn validate(draft: &ServerDraft) -> Result<(String, String, TransportType)> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Server name is required".to_string()));
        }

        let endpoint = draft.endpoint.trim();
        if endpoint.is_empty() {
            return Err(AppError::Validation(
                "Server endpoint is required".to_string(),
            ));
        }

        let transport = draft
            .transport
            .trim()
            .parse::<TransportType>()
            .map_err(AppError::Validation)?;

        Ok((name.to_string(), endpoint.to_string(), transport))
    }

    fn has_token(draft: &ServerDraft) -> Option<&str> {
        draft
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Registers a new server. The record insert, the optional credential,
    /// and the initial log entry commit in one transaction, so a reader never
    /// observes a record without its first log line.
    pub async fn create(&self, draft: &ServerDraft) -> Result<ServerRecord> {
        let (name, endpoint, transport) = Self::validate(draft)?;

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO servers (id, name, endpoint, transport, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(&endpoint)
        .bind(transport)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let auth_configured = match Self::has_token(draft) {
            Some(token) => {
                self.vault.set_in(&mut tx, &id, token).await?;
                true
            }
            None => false,
        };

        ActivityLog::append_in(
            &mut tx,
            &id,
            LogLevel::Info,
            &format!("Server {} added ({}).", name, transport),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(server_id = %id, %transport, "Registered server {}", name);

        Ok(ServerRecord {
            id,
            name,
            endpoint,
            transport,
            created_at,
            last_check_at: None,
            last_check_status: None,
            last_check_latency_ms: None,
            last_check_detail: None,
            auth_configured,
        })
    }

    /// Current snapshot of all records. Ordering is left to the caller; the
    /// dashboard re-sorts by createdAt descending.
    pub async fn list(&self) -> Result<Vec<ServerRecord>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM servers s");
        let servers = sqlx::query_as::<_, ServerRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(servers)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ServerRecord>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM servers s WHERE s.id = ?");
        let server = sqlx::query_as::<_, ServerRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(server)
    }

    /// Replaces name, endpoint, and transport in place. A blank or omitted
    /// token keeps the stored secret (deliberate contract, so edits do not
    /// silently erase credentials); a non-blank token overwrites it.
    /// Last-check fields are untouched.
    pub async fn update(&self, id: &str, draft: &ServerDraft) -> Result<ServerRecord> {
        let (name, endpoint, transport) = Self::validate(draft)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE servers
            SET name = ?, endpoint = ?, transport = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&endpoint)
        .bind(transport)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Server not found".to_string()));
        }

        if let Some(token) = Self::has_token(draft) {
            self.vault.set_in(&mut tx, id, token).await?;
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Server not found".to_string()))
    }

    /// Removes the record, its credential, and its entire log in one
    /// transaction. Deleting an unknown id is not an error; returns whether
    /// a record was actually removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM servers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        CredentialVault::clear_in(&mut tx, id).await?;
        ActivityLog::clear_in(&mut tx, id).await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(server_id = %id, "Deleted server");
        }
        Ok(deleted)
    }

    /// Operator-initiated credential reveal. Exists solely for the token
    /// endpoint; internal code paths never log through this.
    pub async fn token(&self, id: &str) -> Result<Option<Secret>> {
        if self.get(id).await?.is_none() {
            return Err(AppError::NotFound("Server not found".to_string()));
        }

        self.vault.get(id).await
    }

    /// Loads the record plus its credential for a health check.
    pub async fn load_for_check(&self, id: &str) -> Result<Option<(ServerRecord, Option<Secret>)>> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };
        let secret = self.vault.get(id).await?;
        Ok(Some((record, secret)))
    }

    /// Overwrites the last-check fields and appends a log entry summarizing
    /// the check. A record deleted between check start and completion makes
    /// this a silent no-op.
    pub async fn record_check_result(
        &self,
        id: &str,
        status: CheckStatus,
        latency_ms: Option<i64>,
        detail: &str,
    ) -> Result<()> {
        let checked_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE servers
            SET last_check_at = ?, last_check_status = ?,
                last_check_latency_ms = ?, last_check_detail = ?
            WHERE id = ?
            "#,
        )
        .bind(checked_at)
        .bind(status)
        .bind(latency_ms)
        .bind(detail)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted mid-check; nothing to record.
            return Ok(());
        }

        let level = if status == CheckStatus::Healthy {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        let latency = latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "n/a".to_string());

        ActivityLog::append_in(
            &mut tx,
            id,
            level,
            &format!("Connectivity check: {} ({}) - {}", status, latency, detail),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
