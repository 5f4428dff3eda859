use crate::error::{AppError, Result};
use crate::models::{LogEntry, ServerDraft, ServerRecord};
use crate::services::CheckOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ServerListResponse {
    pub servers: Vec<ServerRecord>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    #[serde(rename = "authToken")]
    pub auth_token: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

pub async fn list_servers(State(state): State<AppState>) -> Result<Json<ServerListResponse>> {
    let servers = state.registry.list().await?;
    Ok(Json(ServerListResponse { servers }))
}

pub async fn create_server(
    State(state): State<AppState>,
    Json(draft): Json<ServerDraft>,
) -> Result<(StatusCode, Json<ServerRecord>)> {
    let record = state.registry.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<ServerDraft>,
) -> Result<Json<ServerRecord>> {
    let record = state.registry.update(&id, &draft).await?;
    Ok(Json(record))
}

pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let ok = state.registry.delete(&id).await?;
    Ok(Json(DeleteResponse { ok }))
}

/// Runs a connectivity probe and records the outcome. Probe failures are
/// part of the result, never a request failure: an unreachable endpoint
/// still answers 200 with status "unreachable".
pub async fn check_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CheckOutcome>> {
    let (record, secret) = state
        .registry
        .load_for_check(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Server not found".to_string()))?;

    let outcome = state.checker.check(&record, secret.as_ref()).await;

    state
        .registry
        .record_check_result(&id, outcome.status, outcome.latency_ms, &outcome.detail)
        .await?;

    Ok(Json(outcome))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LogsResponse>> {
    let logs = state.registry.activity_log().entries(&id).await?;
    Ok(Json(LogsResponse { logs }))
}

/// Operator-initiated credential reveal; the only path that returns the
/// plaintext.
pub async fn reveal_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TokenResponse>> {
    let secret = state.registry.token(&id).await?;
    Ok(Json(TokenResponse {
        auth_token: secret.map(|s| s.into_string()),
    }))
}
