//! Health check endpoint payload.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Response body for `GET /health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections.
    pub connections: usize,
}

/// Build the health response.
#[must_use]
pub fn health_check(start_time: Instant, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}
