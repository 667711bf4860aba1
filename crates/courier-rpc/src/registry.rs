//! Function-name → handler mapping.

use std::collections::HashMap;

use courier_core::AccessRule;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::handler::Handler;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Handler names must be non-empty.
    #[error("handler name must not be empty")]
    EmptyName,
}

/// A handler together with the rule guarding it.
#[derive(Clone)]
pub struct HandlerEntry {
    /// The handler.
    pub handler: Handler,
    /// Policy handed to the access gate before each call.
    pub access: AccessRule,
}

/// Registry mapping function names to handlers.
///
/// Reads (one per dispatched message) and writes (registration) may happen
/// concurrently. Re-registering a name replaces the previous handler.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HandlerEntry>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the handler for `func`.
    pub fn register(
        &self,
        func: &str,
        handler: Handler,
        access: AccessRule,
    ) -> Result<(), RegistryError> {
        if func.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let kind = handler.kind();
        let previous = self
            .handlers
            .write()
            .insert(func.to_owned(), HandlerEntry { handler, access });
        if previous.is_some() {
            info!(func, kind, "replaced existing handler");
        } else {
            debug!(func, kind, "registered handler");
        }
        Ok(())
    }

    /// Look up the handler for `func`.
    pub fn lookup(&self, func: &str) -> Option<HandlerEntry> {
        self.handlers.read().get(func).cloned()
    }

    /// Whether `func` has a handler.
    pub fn contains(&self, func: &str) -> bool {
        self.handlers.read().contains_key(func)
    }

    /// All registered names (sorted).
    pub fn functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Reply;
    use crate::request::Request;
    use assert_matches::assert_matches;
    use courier_core::Rejection;
    use serde_json::json;
    use std::sync::Arc;

    fn noop() -> Handler {
        Handler::callback(|_req: Request| -> anyhow::Result<()> { Ok(()) })
    }

    fn promise() -> Handler {
        Handler::promise(|_req: Request| async { Ok::<_, Rejection>(Reply::NoResponse) })
    }

    #[test]
    fn default_registry_is_empty() {
        let reg = HandlerRegistry::default();
        assert!(reg.is_empty());
        assert!(reg.functions().is_empty());
    }

    #[test]
    fn register_and_lookup() {
        let reg = HandlerRegistry::new();
        reg.register("echo", noop(), AccessRule::default()).unwrap();
        let entry = reg.lookup("echo").unwrap();
        assert_eq!(entry.handler.kind(), "callback");
        assert!(entry.access.is_unrestricted());
        assert!(reg.contains("echo"));
    }

    #[test]
    fn lookup_missing() {
        let reg = HandlerRegistry::new();
        assert!(reg.lookup("nope").is_none());
        assert!(!reg.contains("nope"));
    }

    #[test]
    fn empty_name_rejected() {
        let reg = HandlerRegistry::new();
        assert_matches!(
            reg.register("", noop(), AccessRule::default()),
            Err(RegistryError::EmptyName)
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn register_replaces_previous() {
        let reg = HandlerRegistry::new();
        reg.register("f", noop(), AccessRule::default()).unwrap();
        reg.register("f", promise(), AccessRule::new(json!({"role": "admin"})))
            .unwrap();
        assert_eq!(reg.len(), 1);
        let entry = reg.lookup("f").unwrap();
        assert_eq!(entry.handler.kind(), "promise");
        assert!(!entry.access.is_unrestricted());
    }

    #[test]
    fn functions_sorted() {
        let reg = HandlerRegistry::new();
        reg.register("b.two", noop(), AccessRule::default()).unwrap();
        reg.register("a.one", noop(), AccessRule::default()).unwrap();
        assert_eq!(reg.functions(), vec!["a.one", "b.two"]);
    }

    #[test]
    fn any_non_empty_name_accepted() {
        let reg = HandlerRegistry::new();
        let long = "x".repeat(10_000);
        for name in ["ü", " ", "a/b:c", long.as_str()] {
            reg.register(name, noop(), AccessRule::default()).unwrap();
        }
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn concurrent_reads_and_writes() {
        let reg = Arc::new(HandlerRegistry::new());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        reg.register(&format!("f{}", j % 10), noop(), AccessRule::default())
                            .unwrap();
                        let _ = reg.lookup(&format!("f{i}"));
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(reg.len(), 10);
    }
}
