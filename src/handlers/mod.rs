pub mod server_handlers;

use crate::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

/// Builds the control-plane route table consumed by the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/servers",
            get(server_handlers::list_servers).post(server_handlers::create_server),
        )
        .route(
            "/servers/{id}",
            put(server_handlers::update_server).delete(server_handlers::delete_server),
        )
        .route("/servers/{id}/check", post(server_handlers::check_server))
        .route("/servers/{id}/logs", get(server_handlers::get_logs))
        .route("/servers/{id}/token", get(server_handlers::reveal_token))
        .with_state(state)
}
