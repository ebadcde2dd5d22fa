//! Trigger name → handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::SubscriptionHandler;

/// Registry mapping trigger names to their [`SubscriptionHandler`].
///
/// Populated once at startup by the embedding application; lookups after
/// that are read-only, so the map needs no locking.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn SubscriptionHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a trigger name, replacing any previous one.
    pub fn register(&mut self, trigger: &str, handler: impl SubscriptionHandler + 'static) {
        let _ = self.handlers.insert(trigger.to_owned(), Arc::new(handler));
    }

    /// Look up the handler for a trigger name.
    pub fn lookup(&self, trigger: &str) -> Option<Arc<dyn SubscriptionHandler>> {
        self.handlers.get(trigger).cloned()
    }

    /// Whether a trigger name is registered.
    pub fn has_trigger(&self, trigger: &str) -> bool {
        self.handlers.contains_key(trigger)
    }

    /// All registered trigger names (sorted).
    pub fn triggers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
