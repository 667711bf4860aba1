//! Wire envelope and the reply template derived from it.
//!
//! An envelope is an open JSON object. Three keys have meaning to the router
//! (`func`, `data`, `token`); everything else is caller-defined and echoed back
//! on every reply. `data`, `token`, `err` and `errsrc` belong to the router and
//! are never copied from a request into a reply.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::ErrorSource;

/// Key selecting the handler.
pub const FUNC: &str = "func";
/// Key carrying the payload.
pub const DATA: &str = "data";
/// Key carrying the optional caller credential.
pub const TOKEN: &str = "token";
/// Key carrying the human-readable error on replies.
pub const ERR: &str = "err";
/// Key carrying the machine-readable error category on replies.
pub const ERRSRC: &str = "errsrc";

const ROUTER_OWNED: [&str; 4] = [DATA, TOKEN, ERR, ERRSRC];

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Wrap an already-parsed JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Handler name, if present and a string.
    pub fn func(&self) -> Option<&str> {
        self.fields.get(FUNC).and_then(Value::as_str)
    }

    /// Payload. `None` when the key is absent or `null`; an empty object is `Some`.
    pub fn data(&self) -> Option<&Value> {
        self.fields.get(DATA).filter(|v| !v.is_null())
    }

    /// Credential, if present and a string.
    pub fn token(&self) -> Option<&str> {
        self.fields.get(TOKEN).and_then(Value::as_str)
    }

    /// Raw access to any field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Reply template built from a copy of this envelope.
    pub fn template(&self) -> ReplyTemplate {
        ReplyTemplate::from_fields(self.fields.clone())
    }

    /// Split into the reply template, the payload and the credential.
    pub fn into_parts(mut self) -> (Option<Value>, Option<String>, ReplyTemplate) {
        let data = self.fields.remove(DATA).filter(|v| !v.is_null());
        let token = match self.fields.remove(TOKEN) {
            Some(Value::String(token)) => Some(token),
            _ => None,
        };
        (data, token, ReplyTemplate::from_fields(self.fields))
    }

    /// Consume into the underlying object.
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

/// Pass-through fields of a request, shared by every reply to it.
///
/// Cloning is cheap; each [`ReplyTemplate::build`] call produces an
/// independent object so concurrent replies never observe each other.
#[derive(Debug, Clone, Default)]
pub struct ReplyTemplate {
    fields: Arc<Map<String, Value>>,
}

impl ReplyTemplate {
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        for key in ROUTER_OWNED {
            let _ = fields.remove(key);
        }
        Self {
            fields: Arc::new(fields),
        }
    }

    /// The `func` the reply will carry, if the request had one.
    pub fn func(&self) -> Option<&str> {
        self.fields.get(FUNC).and_then(Value::as_str)
    }

    /// Pass-through fields (never contains router-owned keys).
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Build a fresh reply object.
    ///
    /// `err` is always present (`null` on success); `errsrc` only when given.
    pub fn build(
        &self,
        err: Option<Value>,
        data: Value,
        errsrc: Option<ErrorSource>,
    ) -> Map<String, Value> {
        let mut reply = (*self.fields).clone();
        let _ = reply.insert(DATA.to_owned(), data);
        let _ = reply.insert(ERR.to_owned(), err.unwrap_or(Value::Null));
        if let Some(src) = errsrc {
            let _ = reply.insert(ERRSRC.to_owned(), Value::String(src.as_str().to_owned()));
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        match value {
            Value::Object(map) => Envelope::from_map(map),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn accessors_read_known_fields() {
        let env = envelope(json!({"func": "echo", "data": {"x": 1}, "token": "t", "id": 7}));
        assert_eq!(env.func(), Some("echo"));
        assert_eq!(env.data(), Some(&json!({"x": 1})));
        assert_eq!(env.token(), Some("t"));
        assert_eq!(env.get("id"), Some(&json!(7)));
    }

    #[test]
    fn null_data_counts_as_absent() {
        let env = envelope(json!({"func": "f", "data": null}));
        assert!(env.data().is_none());
    }

    #[test]
    fn empty_object_data_is_present() {
        let env = envelope(json!({"func": "f", "data": {}}));
        assert_eq!(env.data(), Some(&json!({})));
    }

    #[test]
    fn non_string_func_is_not_a_func() {
        let env = envelope(json!({"func": 42, "data": {}}));
        assert!(env.func().is_none());
    }

    #[test]
    fn into_parts_strips_router_owned_fields() {
        let env = envelope(json!({
            "func": "f", "data": [1], "token": "secret",
            "err": "stale", "errsrc": "acl", "seq": 3
        }));
        let (data, token, template) = env.into_parts();
        assert_eq!(data, Some(json!([1])));
        assert_eq!(token.as_deref(), Some("secret"));
        assert_eq!(template.fields().len(), 2);
        assert_eq!(template.func(), Some("f"));
        assert_eq!(template.fields()["seq"], 3);
    }

    #[test]
    fn non_string_token_is_dropped() {
        let env = envelope(json!({"func": "f", "data": 1, "token": {"k": 1}}));
        let (_, token, template) = env.into_parts();
        assert!(token.is_none());
        assert!(!template.fields().contains_key(TOKEN));
    }

    #[test]
    fn build_success_reply() {
        let template = envelope(json!({"func": "f", "data": 1, "rid": "a"})).template();
        let reply = Value::Object(template.build(None, json!({"ok": true}), None));
        assert_eq!(reply, json!({"func": "f", "rid": "a", "data": {"ok": true}, "err": null}));
    }

    #[test]
    fn build_error_reply_carries_errsrc() {
        let template = envelope(json!({"func": "f"})).template();
        let reply = template.build(Some(json!("nope")), Value::Null, Some(ErrorSource::Acl));
        assert_eq!(reply[ERR], "nope");
        assert_eq!(reply[ERRSRC], "acl");
        assert!(reply[DATA].is_null());
    }

    #[test]
    fn builds_are_independent() {
        let template = envelope(json!({"func": "f"})).template();
        let mut first = template.build(None, json!(1), None);
        let _ = first.insert("mutated".into(), json!(true));
        let second = template.build(None, json!(2), None);
        assert!(!second.contains_key("mutated"));
        assert_eq!(second[DATA], 2);
    }
}
