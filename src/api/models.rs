use serde::Serialize;

use crate::stats::LatestSnapshot;
use crate::watchdog::Canary;

/// Read-only view of the running session for the HTTP handlers.
pub struct AppState {
    pub latest: LatestSnapshot,
    pub canary: Canary,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the last pending or block event.
    pub idle_secs: i64,
}
