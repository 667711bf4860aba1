//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live `WebSocket` connections.
    pub connections: usize,
    /// Registered handlers.
    pub handlers: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, handlers: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        handlers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn counters_pass_through() {
        let resp = health_check(Instant::now(), 3, 7);
        assert_eq!(resp.connections, 3);
        assert_eq!(resp.handlers, 7);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_value(health_check(Instant::now(), 1, 2)).unwrap();
        assert!(json.get("uptime_secs").is_some());
        assert_eq!(json["handlers"], 2);
    }
}
