//! Prometheus recorder and metric names.

pub use courier_rpc::metrics::{
    DISPATCH_ERRORS_TOTAL, HANDLER_DURATION_SECONDS, MESSAGES_TOTAL, SEND_DROPS_TOTAL,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the global Prometheus recorder.
///
/// Returns the handle `/metrics` renders from. Call once, before any metric
/// is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Connections accepted (counter).
pub const CONNECTIONS_TOTAL: &str = "courier_connections_total";
/// Live connections (gauge).
pub const CONNECTIONS_ACTIVE: &str = "courier_connections_active";
/// Connection lifetime (histogram).
pub const CONNECTION_DURATION_SECONDS: &str = "courier_connection_duration_seconds";
/// Broadcast deliveries that failed (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "courier_broadcast_drops_total";
