//! Per-message request view and response channel.

use std::sync::Arc;

use courier_core::{CallerAttributes, ErrorSource, ReplySink, ReplyTemplate, codec};
use metrics::counter;
use serde_json::Value;
use tracing::{trace, warn};

use crate::metrics::SEND_DROPS_TOTAL;

/// Response channel bound to one inbound message.
///
/// Cheap to clone. Handlers may keep it, move it into spawned tasks and send
/// long after the dispatch that created it has finished. Each send builds a
/// fresh reply from the request's pass-through fields.
#[derive(Clone)]
pub struct Responder {
    template: ReplyTemplate,
    sink: Arc<dyn ReplySink>,
}

impl Responder {
    /// Bind a template to the connection it came from.
    pub fn new(template: ReplyTemplate, sink: Arc<dyn ReplySink>) -> Self {
        Self { template, sink }
    }

    /// Identifier of the originating connection.
    pub fn connection_id(&self) -> &str {
        self.sink.id()
    }

    /// Pass-through fields replies will echo.
    pub fn template(&self) -> &ReplyTemplate {
        &self.template
    }

    /// Send one reply. A non-null `err` is tagged `errsrc = "application"`.
    pub fn send(&self, err: Option<Value>, data: Value) {
        let errsrc = err
            .as_ref()
            .filter(|e| !e.is_null())
            .map(|_| ErrorSource::Application);
        self.emit(err, data, errsrc);
    }

    /// Send one reply with an explicit error category.
    pub fn send_with_source(&self, err: Option<Value>, data: Value, errsrc: ErrorSource) {
        self.emit(err, data, Some(errsrc));
    }

    /// Success reply.
    pub fn ok(&self, data: Value) {
        self.send(None, data);
    }

    /// Application error reply with `data: null`.
    pub fn error(&self, err: impl Into<Value>) {
        self.send(Some(err.into()), Value::Null);
    }

    fn emit(&self, err: Option<Value>, data: Value, errsrc: Option<ErrorSource>) {
        let func = self.template.func().unwrap_or_default();
        let reply = self.template.build(err, data, errsrc);
        let text = match codec::encode(&reply) {
            Ok(text) => text,
            Err(e) => {
                warn!(conn_id = self.sink.id(), func, error = %e, "dropping unencodable reply");
                return;
            }
        };
        match self.sink.send_text(Arc::new(text)) {
            Ok(()) => trace!(conn_id = self.sink.id(), func, "reply enqueued"),
            Err(e) => {
                counter!(SEND_DROPS_TOTAL).increment(1);
                warn!(conn_id = self.sink.id(), func, error = %e, "failed to send reply");
            }
        }
    }
}

/// What a handler sees: an immutable view of the request plus its
/// [`Responder`].
#[derive(Clone)]
pub struct Request {
    func: String,
    data: Value,
    attributes: CallerAttributes,
    responder: Responder,
}

impl Request {
    /// Assemble a request.
    pub fn new(
        func: String,
        data: Value,
        attributes: CallerAttributes,
        responder: Responder,
    ) -> Self {
        Self {
            func,
            data,
            attributes,
            responder,
        }
    }

    /// Handler name this request was routed by.
    pub fn func(&self) -> &str {
        &self.func
    }

    /// Request payload (never `null`).
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Caller attributes resolved by the access gate (empty without one).
    pub fn attributes(&self) -> &CallerAttributes {
        &self.attributes
    }

    /// A caller-defined pass-through field of the request.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.responder.template().fields().get(key)
    }

    /// Identifier of the originating connection.
    pub fn connection_id(&self) -> &str {
        self.responder.connection_id()
    }

    /// The response channel.
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Take the payload and the response channel.
    pub fn into_parts(self) -> (Value, Responder) {
        (self.data, self.responder)
    }

    /// Shorthand for [`Responder::send`].
    pub fn send(&self, err: Option<Value>, data: Value) {
        self.responder.send(err, data);
    }
}
