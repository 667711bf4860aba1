//! Built-in handlers the binary serves out of the box.

use std::sync::Arc;

use courier_core::Rejection;
use courier_rpc::{Dispatcher, RegistryError, Reply};
use courier_server::ConnectionRegistry;
use serde_json::{Value, json};
use tracing::debug;

/// Register `echo`, `ping`, `announce` and `whoami` on `dispatcher`.
///
/// `announce` fans out through `connections`, so it must be the registry the
/// server sessions add themselves to.
pub fn register_demo_handlers(
    dispatcher: &Dispatcher,
    connections: Arc<ConnectionRegistry>,
) -> Result<(), RegistryError> {
    dispatcher.add_handler("echo", |req| {
        req.send(None, req.data().clone());
        Ok(())
    })?;

    dispatcher.add_promise_handler("ping", |_req| async {
        Ok::<_, Rejection>(Reply::data(json!({"pong": true})))
    })?;

    dispatcher.add_handler("announce", move |req| {
        let report = connections.broadcast(&json!({
            "announcement": req.data(),
            "from": req.connection_id(),
        }))?;
        debug!(delivered = report.delivered, failed = report.failed, "announce fan-out");
        req.send(None, json!({"delivered": report.delivered}));
        Ok(())
    })?;

    dispatcher.add_promise_handler("whoami", |req| async move {
        Ok::<_, Rejection>(Reply::data(Value::Object(req.attributes().clone())))
    })?;

    Ok(())
}
