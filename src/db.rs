use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::env;

/// Default database URL when CONTROL_PLANE_DB is unset. `mode=rwc` creates
/// the file on first start.
const DEFAULT_DATABASE_URL: &str = "sqlite://control-plane.db?mode=rwc";

pub async fn create_pool() -> Result<SqlitePool, sqlx::Error> {
    let database_url =
        env::var("CONTROL_PLANE_DB").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    // Ensure the data directory exists
    if let Some(parent) = std::path::Path::new(&database_url.replace("sqlite://", "")).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    Ok(pool)
}
