//! The per-trigger subscription handle.

use async_trait::async_trait;
use serde_json::Value;

use crate::document::Document;
use crate::errors::GatewayError;

/// Handle for one trigger name, registered in a
/// [`HandlerRegistry`](crate::registry::HandlerRegistry) at startup.
///
/// Lifecycle, per connection:
///
/// 1. `can_subscribe` gates every `subscription_start` for this trigger.
/// 2. `on_subscribe` runs once — on the connection's first successful
///    subscribe — and produces the connection context. Returning `None`
///    denies the subscription. The context is reused unchanged for every
///    later `filter` and `execute` call on that connection.
/// 3. `filter` decides, per broadcast event, whether a stored subscription
///    receives it.
/// 4. `execute` turns the stored document into the pushed payload.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// Authorization gate for a subscribe request.
    ///
    /// `context` is `None` when the connection has not produced one yet
    /// (i.e. this is its first subscribe). The default accepts everything.
    async fn can_subscribe(
        &self,
        _variables: &Value,
        _auth: &Value,
        _context: Option<&Value>,
    ) -> bool {
        true
    }

    /// Produce the connection context. `None` denies the subscription.
    ///
    /// The default yields an empty context, for handlers that only need
    /// variables.
    async fn on_subscribe(&self, _variables: &Value, _auth: &Value) -> Option<Value> {
        Some(Value::Null)
    }

    /// Event predicate: should a subscription with these stored variables
    /// receive the current event? The default matches everything with the
    /// same trigger name.
    fn filter(&self, _variables: &Value, _context: &Value) -> bool {
        true
    }

    /// Execute the stored document against (context, variables) and return
    /// the payload for the `subscription_data` frame.
    async fn execute(
        &self,
        document: &Document,
        context: &Value,
        variables: &Value,
    ) -> Result<Value, GatewayError>;
}
