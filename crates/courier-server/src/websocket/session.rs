//! `WebSocket` session lifecycle, from upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use courier_core::ReplySink;
use courier_rpc::Dispatcher;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;
use crate::metrics::{CONNECTION_DURATION_SECONDS, CONNECTIONS_ACTIVE, CONNECTIONS_TOTAL};

/// Per-connection limits.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Ping period.
    pub heartbeat_interval: Duration,
    /// Silence allowed before disconnecting.
    pub heartbeat_timeout: Duration,
}

/// Everything a session needs, shared by all connections.
#[derive(Clone)]
pub struct SessionContext {
    /// Routes inbound messages.
    pub dispatcher: Arc<Dispatcher>,
    /// Live connection set.
    pub connections: Arc<ConnectionRegistry>,
    /// Per-connection limits.
    pub limits: SessionLimits,
    /// Server-wide stop signal.
    pub shutdown: CancellationToken,
}

/// Run a session for one connected client.
///
/// Inbound frames are read one at a time. Each message is routed (decoded,
/// validated and resolved) before the next frame is read; authorization and
/// the handler then run on their own task, so replies to back-to-back
/// messages may arrive in either order.
///
/// The session ends on a close frame, end of stream, transport error, writer
/// failure, heartbeat timeout or server shutdown. In every case the
/// connection is removed from the registry.
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(ws: WebSocket, conn_id: String, ctx: SessionContext) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let limits = ctx.limits;

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(limits.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), send_tx));
    let sink: Arc<dyn ReplySink> = connection.clone();

    ctx.connections.add(connection.clone());
    info!("client connected");
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);

    // Outbound forwarder with periodic pings.
    let writer_conn = connection.clone();
    let writer_shutdown = ctx.shutdown.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(limits.heartbeat_interval);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        debug!("write failed, closing");
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if writer_conn.last_seen_elapsed() > limits.heartbeat_timeout {
                        warn!(timeout = ?limits.heartbeat_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = writer_shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(error = %e, "transport error");
                    break;
                }
            };
            connection.mark_alive();

            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(s) => s,
                    Err(_) => {
                        info!(len = data.len(), "ignoring non-UTF8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => {
                    info!("client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            if let Some(call) = ctx.dispatcher.route(Arc::clone(&sink), &text) {
                drop(tokio::spawn(call.run()));
            }
        }
    };

    tokio::select! {
        () = reader => {}
        _ = &mut writer => {}
    }
    writer.abort();

    let _ = ctx.connections.remove(&conn_id);
    info!(dropped = connection.drop_count(), "client disconnected");
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

/// Limits from a server config.
impl From<&crate::config::ServerConfig> for SessionLimits {
    fn from(config: &crate::config::ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity,
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}
