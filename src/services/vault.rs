use crate::error::Result;
use crate::services::secrets::{Secret, SecretCipher};
use anyhow::Context;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Encrypted per-server credential storage. Secrets are keyed by server id
/// and stored AES-256-GCM encrypted; a blank token is treated as "no
/// credential" and never stored as an empty secret.
#[derive(Clone)]
pub struct CredentialVault {
    pool: SqlitePool,
    cipher: SecretCipher,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

impl CredentialVault {
    pub fn new(pool: SqlitePool, cipher: SecretCipher) -> Self {
        Self { pool, cipher }
    }

    /// Stores (or overwrites) the credential for a server. Blank input
    /// clears any stored secret.
    pub async fn set(&self, server_id: &str, token: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.set_in(&mut conn, server_id, token).await
    }

    pub(crate) async fn set_in(
        &self,
        conn: &mut SqliteConnection,
        server_id: &str,
        token: &str,
    ) -> Result<()> {
        if token.trim().is_empty() {
            Self::clear_in(conn, server_id).await?;
            return Ok(());
        }

        let encrypted = self
            .cipher
            .encrypt(&Secret::new(token))
            .context("Failed to encrypt credential")?;

        sqlx::query(
            r#"
            INSERT INTO credentials (server_id, secret)
            VALUES (?, ?)
            ON CONFLICT (server_id) DO UPDATE SET secret = excluded.secret
            "#,
        )
        .bind(server_id)
        .bind(&encrypted)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn get(&self, server_id: &str) -> Result<Option<Secret>> {
        let row = sqlx::query("SELECT secret FROM credentials WHERE server_id = ?")
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let encrypted: String = row.get("secret");
                let secret = self
                    .cipher
                    .decrypt(&encrypted)
                    .context("Failed to decrypt credential")?;
                Ok(Some(secret))
            }
            None => Ok(None),
        }
    }

    pub async fn clear(&self, server_id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::clear_in(&mut conn, server_id).await
    }

    pub(crate) async fn clear_in(conn: &mut SqliteConnection, server_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE server_id = ?")
            .bind(server_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
