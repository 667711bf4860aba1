//! Per-message state machine.
//!
//! `Received → Decoded → Validated → HandlerResolved` runs synchronously in
//! [`Dispatcher::route`], so a connection that routes its messages one after
//! another sees them resolved in arrival order. Authorization and invocation
//! happen in [`PendingCall::run`]; when a connection runs several of those
//! concurrently they may finish in any order.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use courier_core::{
    AccessGate, AccessRule, CallerAttributes, Rejection, ReplySink, RouteError, codec,
};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, warn};

use crate::handler::{CallbackHandler, Handler, PromiseHandler, Reply};
use crate::metrics::{DISPATCH_ERRORS_TOTAL, HANDLER_DURATION_SECONDS, MESSAGES_TOTAL};
use crate::registry::{HandlerEntry, HandlerRegistry, RegistryError};
use crate::request::{Request, Responder};

/// How calls are authorized.
#[derive(Clone)]
pub enum Authorization {
    /// Every call goes through this gate.
    Gate(Arc<dyn AccessGate>),
    /// No gate: access rules are ignored and callers have no attributes.
    Disabled,
}

impl Authorization {
    /// Whether a gate is configured.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Gate(_))
    }

    async fn authorize(
        &self,
        token: Option<&str>,
        rule: &AccessRule,
    ) -> Result<CallerAttributes, Rejection> {
        match self {
            Self::Gate(gate) => gate.check(token, rule).await,
            Self::Disabled => Ok(CallerAttributes::new()),
        }
    }
}

/// Owns the handler registry and the authorization policy for one router.
///
/// Independent instances share nothing.
pub struct Dispatcher {
    registry: HandlerRegistry,
    authorization: Authorization,
}

impl Dispatcher {
    /// Create a dispatcher with the given authorization policy.
    pub fn new(authorization: Authorization) -> Self {
        if !authorization.is_enabled() {
            warn!("no access gate configured; handler access rules will not be enforced");
        }
        Self {
            registry: HandlerRegistry::new(),
            authorization,
        }
    }

    /// Create a dispatcher that authorizes every call through `gate`.
    pub fn with_gate(gate: impl AccessGate + 'static) -> Self {
        Self::new(Authorization::Gate(Arc::new(gate)))
    }

    /// Create a dispatcher without authorization.
    pub fn without_gate() -> Self {
        Self::new(Authorization::Disabled)
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The authorization policy.
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// Register an unrestricted callback handler.
    pub fn add_handler<F>(&self, func: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_handler_with_access(func, AccessRule::default(), handler)
    }

    /// Register a callback handler guarded by `access`.
    pub fn add_handler_with_access<F>(
        &self,
        func: &str,
        access: AccessRule,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(func, Handler::callback(handler), access)
    }

    /// Register an unrestricted promise handler.
    pub fn add_promise_handler<F, Fut>(&self, func: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Rejection>> + Send + 'static,
    {
        self.add_promise_handler_with_access(func, AccessRule::default(), handler)
    }

    /// Register a promise handler guarded by `access`.
    pub fn add_promise_handler_with_access<F, Fut>(
        &self,
        func: &str,
        access: AccessRule,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, Rejection>> + Send + 'static,
    {
        self.register(func, Handler::promise(handler), access)
    }

    /// Register a handler implemented as a type rather than a closure.
    pub fn add_callback_handler(
        &self,
        func: &str,
        access: AccessRule,
        handler: impl CallbackHandler + 'static,
    ) -> Result<(), RegistryError> {
        self.register(func, Handler::callback(handler), access)
    }

    /// Register a promise handler implemented as a type rather than a closure.
    pub fn add_promise_handler_impl(
        &self,
        func: &str,
        access: AccessRule,
        handler: impl PromiseHandler + 'static,
    ) -> Result<(), RegistryError> {
        self.register(func, Handler::promise(handler), access)
    }

    fn register(
        &self,
        func: &str,
        handler: Handler,
        access: AccessRule,
    ) -> Result<(), RegistryError> {
        if !self.authorization.is_enabled() && !access.is_unrestricted() {
            warn!(func, "access rule registered without a gate; it will not be enforced");
        }
        self.registry.register(func, handler, access)
    }

    /// Decode, validate and resolve one inbound message.
    ///
    /// Returns the call to run, or `None` when the message was dropped or
    /// already answered with an error reply.
    pub fn route(&self, sink: Arc<dyn ReplySink>, text: &str) -> Option<PendingCall> {
        counter!(MESSAGES_TOTAL).increment(1);

        let envelope = match codec::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                counter!(DISPATCH_ERRORS_TOTAL, "errsrc" => "parse").increment(1);
                warn!(conn_id = sink.id(), error = %e, "dropping undecodable message");
                return None;
            }
        };

        let func = envelope.func().map(str::to_owned);
        let (data, token, template) = envelope.into_parts();
        let responder = Responder::new(template, sink);

        let Some(func) = func else {
            reject(&responder, &RouteError::MissingFunc);
            return None;
        };
        let Some(data) = data else {
            reject(&responder, &RouteError::MissingData);
            return None;
        };
        let Some(entry) = self.registry.lookup(&func) else {
            reject(&responder, &RouteError::NoSuchHandler { func });
            return None;
        };

        debug!(conn_id = responder.connection_id(), %func, kind = entry.handler.kind(), "routing message");
        Some(PendingCall {
            func,
            data,
            token,
            entry,
            responder,
            authorization: self.authorization.clone(),
        })
    }

    /// Route and run one message to completion of its handler invocation.
    pub async fn dispatch(&self, sink: Arc<dyn ReplySink>, text: &str) {
        if let Some(call) = self.route(sink, text) {
            call.run().await;
        }
    }
}

/// A resolved message waiting for authorization and invocation.
pub struct PendingCall {
    func: String,
    data: Value,
    token: Option<String>,
    entry: HandlerEntry,
    responder: Responder,
    authorization: Authorization,
}

impl PendingCall {
    /// The resolved function name.
    pub fn func(&self) -> &str {
        &self.func
    }

    /// Authorize, then invoke the handler.
    pub async fn run(self) {
        let Self {
            func,
            data,
            token,
            entry,
            responder,
            authorization,
        } = self;

        let attributes = match authorization.authorize(token.as_deref(), &entry.access).await {
            Ok(attributes) => attributes,
            Err(rejection) => {
                reject(
                    &responder,
                    &RouteError::Denied {
                        reason: rejection.reason,
                    },
                );
                return;
            }
        };

        let start = Instant::now();
        let request = Request::new(func.clone(), data, attributes, responder);
        entry.handler.invoke(request).await;
        histogram!(HANDLER_DURATION_SECONDS, "func" => func)
            .record(start.elapsed().as_secs_f64());
    }
}

fn reject(responder: &Responder, err: &RouteError) {
    let source = err.source();
    counter!(DISPATCH_ERRORS_TOTAL, "errsrc" => source.as_str()).increment(1);
    debug!(conn_id = responder.connection_id(), errsrc = %source, error = %err, "rejecting message");
    responder.send_with_source(Some(err.reason()), Value::Null, source);
}
