//! Attribute-matching semantics for access rules.
//!
//! A restricted rule is a JSON object. Every key must be present in the
//! caller's attributes, and the attribute must equal the rule value. When
//! either side is an array, sharing one element is enough.

use courier_core::{AccessRule, CallerAttributes, Rejection};
use serde_json::Value;

/// Reason sent when a restricted handler is called without a token.
pub const MISSING_TOKEN: &str = "missing token";
/// Reason sent when the token does not verify.
pub const INVALID_TOKEN: &str = "invalid token";

/// Check `attributes` against `rule`.
///
/// Returns the name of the first attribute that does not match.
pub fn rule_satisfied(rule: &AccessRule, attributes: &CallerAttributes) -> Result<(), String> {
    let conditions = match rule.as_value() {
        Value::Null => return Ok(()),
        Value::Object(conditions) => conditions,
        _ => return Err("rule".to_owned()),
    };
    for (key, required) in conditions {
        match attributes.get(key) {
            Some(actual) if values_match(required, actual) => {}
            _ => return Err(key.clone()),
        }
    }
    Ok(())
}

fn values_match(required: &Value, actual: &Value) -> bool {
    match (required, actual) {
        (Value::Array(wanted), Value::Array(held)) => wanted.iter().any(|w| held.contains(w)),
        (Value::Array(wanted), single) => wanted.contains(single),
        (single, Value::Array(held)) => held.contains(single),
        (a, b) => a == b,
    }
}

/// Shared gate flow.
///
/// `verify` resolves a token to attributes, or `None` when it is not valid.
/// Unrestricted rules always pass, carrying the token's attributes when it
/// verifies.
pub fn evaluate<F>(
    token: Option<&str>,
    rule: &AccessRule,
    verify: F,
) -> Result<CallerAttributes, Rejection>
where
    F: FnOnce(&str) -> Option<CallerAttributes>,
{
    if rule.is_unrestricted() {
        return Ok(token.and_then(verify).unwrap_or_default());
    }
    let token = token.ok_or_else(|| Rejection::from(MISSING_TOKEN))?;
    let attributes = verify(token).ok_or_else(|| Rejection::from(INVALID_TOKEN))?;
    rule_satisfied(rule, &attributes)
        .map_err(|attr| Rejection::new(format!("access denied: {attr}")))?;
    Ok(attributes)
}
