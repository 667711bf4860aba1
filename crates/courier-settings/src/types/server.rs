use serde::{Deserialize, Serialize};

/// Listener and per-connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (0 picks a free one).
    pub port: u16,
    /// WebSocket upgrade path.
    pub ws_path: String,
    /// Outbound messages buffered per connection before new ones are dropped.
    pub send_queue_capacity: usize,
    /// Seconds between pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence before a connection is closed.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            ws_path: "/ws".to_string(),
            send_queue_capacity: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}
