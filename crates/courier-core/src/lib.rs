//! # courier-core
//!
//! Wire types and collaborator contracts shared by the courier crates.
//!
//! - [`envelope`]: the inbound envelope and the reply template derived from it
//! - [`codec`]: text ⇄ envelope conversion
//! - [`errors`]: the client-visible error taxonomy (`errsrc` categories)
//! - [`access`]: access rules, caller attributes and the [`AccessGate`] contract
//! - [`sink`]: the [`ReplySink`] contract a transport connection implements

#![deny(unsafe_code)]

pub mod access;
pub mod codec;
pub mod envelope;
pub mod errors;
pub mod sink;

pub use access::{AccessGate, AccessRule, CallerAttributes, Rejection};
pub use codec::{CodecError, decode, encode};
pub use envelope::{Envelope, ReplyTemplate};
pub use errors::{ErrorSource, RouteError};
pub use sink::{ReplySink, SendError};
