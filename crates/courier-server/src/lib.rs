//! # courier-server
//!
//! Axum HTTP + `WebSocket` transport for a [`courier_rpc::Dispatcher`].
//!
//! - `WebSocket` gateway: one session task per connection, heartbeat, and
//!   per-connection bounded send queues
//! - Connection registry with idempotent removal and snapshot broadcast
//! - `/health` and `/metrics` endpoints
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::CourierServer;
pub use shutdown::ShutdownCoordinator;
pub use websocket::connection::ClientConnection;
pub use websocket::registry::{BroadcastReport, ConnectionRegistry};
