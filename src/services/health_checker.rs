//! Transport connectivity probes.
//!
//! One probe implementation per transport type (http, sse, stdio), selected
//! by the record's transport and run under a wall-clock budget. Probes never
//! propagate errors: every failure mode is folded into a
//! [`CheckOutcome`] so the operator always receives actionable status.

use crate::models::{CheckStatus, ServerRecord, TransportType};
use crate::services::secrets::Secret;
use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Result of a single connectivity probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub latency_ms: Option<i64>,
    pub detail: String,
}

impl CheckOutcome {
    fn healthy(latency_ms: i64, detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Healthy,
            latency_ms: Some(latency_ms),
            detail: detail.into(),
        }
    }

    fn unreachable(latency_ms: Option<i64>, detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Unreachable,
            latency_ms,
            detail: detail.into(),
        }
    }

    fn error(latency_ms: Option<i64>, detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            latency_ms,
            detail: detail.into(),
        }
    }
}

#[async_trait]
trait TransportProbe: Send + Sync {
    async fn probe(&self, endpoint: &str, token: Option<&Secret>, budget: Duration)
        -> CheckOutcome;
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}

/// Classifies a received HTTP response: 2xx/3xx is healthy, anything else is
/// an error with the status as detail.
fn classify_response(status: reqwest::StatusCode, latency_ms: i64) -> CheckOutcome {
    if status.is_client_error() || status.is_server_error() {
        CheckOutcome::error(Some(latency_ms), format!("HTTP {}", status))
    } else {
        CheckOutcome::healthy(latency_ms, "Connection succeeded.")
    }
}

fn classify_request_error(err: &reqwest::Error, latency_ms: i64) -> CheckOutcome {
    if err.is_timeout() {
        CheckOutcome::unreachable(Some(latency_ms), format!("Request timed out: {}", err))
    } else if err.is_connect() {
        CheckOutcome::unreachable(Some(latency_ms), format!("Connection failed: {}", err))
    } else {
        CheckOutcome::error(Some(latency_ms), format!("Request failed: {}", err))
    }
}

/// Lightweight GET against an http endpoint. Latency is measured from
/// request start to response headers; the body is never read.
struct HttpProbe {
    client: reqwest::Client,
}

#[async_trait]
impl TransportProbe for HttpProbe {
    async fn probe(
        &self,
        endpoint: &str,
        token: Option<&Secret>,
        _budget: Duration,
    ) -> CheckOutcome {
        let start = Instant::now();

        let mut request = self.client.get(endpoint);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        match request.send().await {
            Ok(response) => classify_response(response.status(), elapsed_ms(start)),
            Err(err) => classify_request_error(&err, elapsed_ms(start)),
        }
    }
}

/// Opens the SSE stream and confirms the connection is accepted before any
/// event is read.
struct SseProbe {
    client: reqwest::Client,
}

#[async_trait]
impl TransportProbe for SseProbe {
    async fn probe(
        &self,
        endpoint: &str,
        token: Option<&Secret>,
        _budget: Duration,
    ) -> CheckOutcome {
        let start = Instant::now();

        let mut request = self
            .client
            .get(endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }

        // send() resolves once response headers arrive; the event stream
        // itself is dropped unread.
        match request.send().await {
            Ok(response) => classify_response(response.status(), elapsed_ms(start)),
            Err(err) => classify_request_error(&err, elapsed_ms(start)),
        }
    }
}

/// Spawns the configured command as a short-lived subprocess and waits for a
/// first line of stdout as a handshake. A process that starts and stays
/// silent for the whole budget still counts as healthy; the child is killed
/// on the way out either way.
struct StdioProbe;

#[async_trait]
impl TransportProbe for StdioProbe {
    async fn probe(
        &self,
        endpoint: &str,
        _token: Option<&Secret>,
        budget: Duration,
    ) -> CheckOutcome {
        let start = Instant::now();

        let mut parts = endpoint.split_whitespace();
        let Some(program) = parts.next() else {
            return CheckOutcome::error(None, "Empty command line".to_string());
        };

        let mut command = Command::new(program);
        command
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return CheckOutcome::unreachable(
                    Some(elapsed_ms(start)),
                    format!("Failed to spawn '{}': {}", program, err),
                );
            }
        };

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            return CheckOutcome::error(Some(elapsed_ms(start)), "Failed to capture process stdout");
        };
        let mut lines = BufReader::new(stdout).lines();

        let outcome = match timeout(budget, lines.next_line()).await {
            Ok(Ok(Some(_))) => CheckOutcome::healthy(
                elapsed_ms(start),
                "Process started and produced handshake output.",
            ),
            // stdout closed without output; see how the process exited.
            Ok(Ok(None)) | Ok(Err(_)) => {
                match timeout(Duration::from_millis(250), child.wait()).await {
                    Ok(Ok(status)) if status.success() => CheckOutcome::healthy(
                        elapsed_ms(start),
                        "Process started and exited cleanly.",
                    ),
                    Ok(Ok(status)) => CheckOutcome::error(
                        Some(elapsed_ms(start)),
                        format!("Process exited abnormally: {}", status),
                    ),
                    Ok(Err(err)) => CheckOutcome::error(
                        Some(elapsed_ms(start)),
                        format!("Failed to await process: {}", err),
                    ),
                    // Still running with stdout closed; it did start.
                    Err(_) => CheckOutcome::healthy(elapsed_ms(start), "Process started."),
                }
            }
            // No handshake within the budget but the process is up.
            Err(_) => CheckOutcome::healthy(
                elapsed_ms(start),
                "Process started (no handshake output within budget).",
            ),
        };

        // kill_on_drop covers the drop path; make the common path explicit.
        let _ = child.start_kill();
        outcome
    }
}

/// Per-transport connectivity checker with a bounded wall-clock budget.
/// `check` never blocks past the budget (plus a small grace period for
/// cleanup) and never returns an error: a hung probe is reported as
/// unreachable.
pub struct HealthChecker {
    budget: Duration,
    http: HttpProbe,
    sse: SseProbe,
    stdio: StdioProbe,
}

impl HealthChecker {
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(5);

    /// Backstop past the probes' own deadlines before the checker gives up
    /// on a probe future entirely.
    const BUDGET_GRACE: Duration = Duration::from_millis(500);

    pub fn new(budget: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(budget)
            .connect_timeout(budget)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            budget,
            http: HttpProbe {
                client: client.clone(),
            },
            sse: SseProbe { client },
            stdio: StdioProbe,
        }
    }

    /// Reads the budget from CONTROL_PLANE_CHECK_TIMEOUT_MS, defaulting to
    /// five seconds.
    pub fn from_env() -> Self {
        let budget = std::env::var("CONTROL_PLANE_CHECK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_BUDGET);

        Self::new(budget)
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub async fn check(&self, record: &ServerRecord, token: Option<&Secret>) -> CheckOutcome {
        let probe: &dyn TransportProbe = match record.transport {
            TransportType::Http => &self.http,
            TransportType::Sse => &self.sse,
            TransportType::Stdio => &self.stdio,
        };

        match timeout(
            self.budget + Self::BUDGET_GRACE,
            probe.probe(&record.endpoint, token, self.budget),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => CheckOutcome::unreachable(
                Some(self.budget.as_millis() as i64),
                format!("Probe timed out after {}ms", self.budget.as_millis()),
            ),
        }
    }
}
