//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live bridges, one per connected panel.
    pub bridges: usize,
    /// Whether a debug session is available for new panels.
    pub session_active: bool,
    /// RFC 3339 time of the check.
    pub timestamp: String,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, bridges: usize, session_active: bool) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        bridges,
        session_active,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
