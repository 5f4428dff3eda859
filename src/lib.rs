pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use services::{HealthChecker, ServerRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServerRegistry>,
    pub checker: Arc<HealthChecker>,
    pub pool: sqlx::SqlitePool,
}
