//! # courier-auth
//!
//! [`AccessGate`](courier_core::AccessGate) implementations.
//!
//! Both gates share the rule semantics in [`rule`]: an access rule is a JSON
//! object whose keys name caller attributes the token must carry.
//!
//! - [`StaticTokenGate`]: fixed token → attributes table
//! - [`JwtGate`]: HS256-signed JWTs whose claims become the attributes

#![deny(unsafe_code)]

pub mod errors;
pub mod jwt;
pub mod rule;
pub mod static_gate;

pub use errors::AuthError;
pub use jwt::JwtGate;
pub use rule::{evaluate, rule_satisfied};
pub use static_gate::StaticTokenGate;
