//! `CourierServer`: Axum HTTP + `WebSocket` server around one dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use courier_rpc::Dispatcher;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::connection::ClientConnection;
use crate::websocket::registry::{BroadcastReport, ConnectionRegistry};
use crate::websocket::session::{SessionContext, SessionLimits, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
struct AppState {
    session: SessionContext,
    start_time: Instant,
    max_message_size: usize,
    metrics: Option<PrometheusHandle>,
}

/// The courier server.
///
/// Owns the connection registry and the shutdown signal; the dispatcher is
/// shared with whoever registers handlers.
pub struct CourierServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    connections: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl CourierServer {
    /// Create a server that routes every connection through `dispatcher`.
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            connections: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            session: SessionContext {
                dispatcher: Arc::clone(&self.dispatcher),
                connections: Arc::clone(&self.connections),
                limits: SessionLimits::from(&self.config),
                shutdown: self.shutdown.token(),
            },
            start_time: self.start_time,
            max_message_size: self.config.max_message_size,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route(&self.config.ws_path, get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and start serving in the background.
    ///
    /// Returns the bound address (useful with port 0) and the serve task,
    /// which finishes after [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, ws_path = %self.config.ws_path, "courier server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
            info!("server stopped");
        });

        Ok((local_addr, handle))
    }

    /// The dispatcher handlers are registered on.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Live connections.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Send `obj` verbatim to one connection.
    pub fn send_obj<T: Serialize + ?Sized>(
        &self,
        connection_id: &str,
        obj: &T,
    ) -> Result<(), ServerError> {
        self.connections.send_obj(connection_id, obj)
    }

    /// Send `obj` verbatim to every live connection.
    pub fn broadcast<T: Serialize + ?Sized>(&self, obj: &T) -> Result<BroadcastReport, ServerError> {
        self.connections.broadcast(obj)
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET `<ws_path>`: upgrade and hand the socket to a session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let conn_id = ClientConnection::new_id();
    let session = state.session;
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, session))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.session.connections.len(),
        state.session.dispatcher.registry().len(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
