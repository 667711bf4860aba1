//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their compiled default.

mod auth;
mod logging;
mod server;

pub use auth::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000, "sendQueueCapacity": 256 },
///   "logging": { "level": "debug", "modules": { "courier_rpc": "trace" } },
///   "auth": { "mode": "jwt", "jwt": { "secret": "..." } }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourierSettings {
    /// Listener and per-connection limits.
    pub server: ServerSettings,
    /// Log level and format.
    pub logging: LoggingSettings,
    /// Which access gate to install.
    pub auth: AuthSettings,
}
