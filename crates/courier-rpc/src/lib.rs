//! # courier-rpc
//!
//! The dispatch engine: every inbound text message goes through
//! decode → validate → handler lookup → authorization → invocation, and the
//! handler answers through a [`Responder`] zero, one or many times.
//!
//! Handlers come in two shapes, unified behind [`Handler`]:
//! - [`CallbackHandler`]: called synchronously, replies through the request
//!   whenever it likes (including after returning).
//! - [`PromiseHandler`]: async, its outcome becomes exactly one reply (or none
//!   for [`Reply::NoResponse`]).

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod handler;
pub mod metrics;
pub mod registry;
pub mod request;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dispatcher::{Authorization, Dispatcher, PendingCall};
pub use handler::{CallbackHandler, Handler, PromiseHandler, Reply};
pub use registry::{HandlerEntry, HandlerRegistry, RegistryError};
pub use request::{Request, Responder};
