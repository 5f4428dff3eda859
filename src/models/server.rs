use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Connection method for a registered MCP server. Selects the probe strategy
/// used by the health checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TransportType {
    Stdio,
    Http,
    Sse,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Stdio => "stdio",
            TransportType::Http => "http",
            TransportType::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportType::Stdio),
            "http" => Ok(TransportType::Http),
            "sse" => Ok(TransportType::Sse),
            other => Err(format!(
                "Unknown transport type '{}' (expected stdio, http, or sse)",
                other
            )),
        }
    }
}

/// Outcome classification of a connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unreachable,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckStatus::Healthy => "healthy",
            CheckStatus::Unreachable => "unreachable",
            CheckStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A registered MCP server as stored in the registry and serialized to the
/// dashboard. The raw credential never appears here; only the derived
/// `authConfigured` flag is exposed.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub transport: TransportType,
    pub created_at: DateTime<Utc>,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_check_status: Option<CheckStatus>,
    pub last_check_latency_ms: Option<i64>,
    pub last_check_detail: Option<String>,
    pub auth_configured: bool,
}

/// Request body for POST /servers and PUT /servers/{id}. The transport type
/// arrives as a plain string so unrecognized values surface as a validation
/// error rather than a deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(rename = "type", default)]
    pub transport: String,
    #[serde(rename = "authToken")]
    pub auth_token: Option<String>,
}
