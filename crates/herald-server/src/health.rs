//! `/health` endpoint body.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"`, or `"shutting_down"` once shutdown is triggered.
    pub status: &'static str,
    /// When the server started.
    pub started_at: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Attached channel connections.
    pub connections: usize,
    /// Connection limit; upgrades beyond it get 503.
    pub max_connections: usize,
}

/// Process start markers for uptime reporting.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Uptime {
    /// Mark now as the start.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Build a health report from live counters.
    pub fn report(
        &self,
        connections: usize,
        max_connections: usize,
        shutting_down: bool,
    ) -> HealthResponse {
        HealthResponse {
            status: if shutting_down { "shutting_down" } else { "ok" },
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            connections,
            max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_server_is_ok() {
        let report = Uptime::start().report(3, 10, false);
        assert_eq!(report.status, "ok");
        assert_eq!(report.connections, 3);
        assert!(report.uptime_secs < 2);
    }

    #[test]
    fn draining_server_says_so() {
        assert_eq!(Uptime::start().report(0, 10, true).status, "shutting_down");
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(Uptime::start().report(2, 256, false)).unwrap();
        assert_eq!(json["connections"], 2);
        assert_eq!(json["maxConnections"], 256);
        assert!(json["uptimeSecs"].is_number());
        assert!(json["startedAt"].is_string());
    }
}
