pub mod test_helpers {
    use crate::services::{
        ActivityLog, CredentialVault, HealthChecker, SecretCipher, ServerRegistry,
    };
    use crate::AppState;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when multiple pool connections need to see the same data
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Registry wired over the given pool with a throwaway master key.
    pub fn build_registry(pool: &SqlitePool) -> ServerRegistry {
        let cipher = SecretCipher::from_base64_key(&SecretCipher::generate_master_key())
            .expect("generated key is valid");
        let vault = CredentialVault::new(pool.clone(), cipher);
        let logs = ActivityLog::new(pool.clone());
        ServerRegistry::new(pool.clone(), vault, logs)
    }

    /// Full application state with a short check budget for probe tests.
    pub fn build_app_state(pool: SqlitePool, check_budget: Duration) -> AppState {
        let registry = Arc::new(build_registry(&pool));
        let checker = Arc::new(HealthChecker::new(check_budget));
        AppState {
            registry,
            checker,
            pool,
        }
    }
}
