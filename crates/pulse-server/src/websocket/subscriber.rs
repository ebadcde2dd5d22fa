//! Per-connection subscription state and broadcast filtering.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::{Mutex, RwLock};
use pulse_gateway::{Document, DocumentParser, HandlerRegistry};
use pulse_proto::channel::EventMessage;
use pulse_proto::errors::{ErrorEntry, SubscribeError};
use pulse_proto::frames::{ServerFrame, SubscriptionId};
use serde_json::Value;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::{
    BROADCAST_DELIVERIES_TOTAL, BROADCAST_DROPS_TOTAL, EXECUTION_FAILURES_TOTAL,
    SUBSCRIPTIONS_ACTIVE,
};

/// One registered subscription.
#[derive(Clone, Debug)]
pub struct Subscription {
    /// Client-chosen id.
    pub id: SubscriptionId,
    /// Parsed document (still carries the original text).
    pub document: Document,
    /// Decoded operation variables.
    pub variables: Value,
    /// Trigger name resolved at subscribe time; never changes.
    pub trigger: String,
}

/// Per-connection holder of active subscriptions and authorization context.
///
/// Context lifecycle: the connection context is produced by the matched
/// handler's `on_subscribe` during the connection's first successful
/// subscribe and reused unchanged for every later `can_subscribe`, `filter`,
/// and `execute` call. `authorize` only stores the raw auth value those
/// hooks consume.
pub struct Subscriber {
    parser: Arc<dyn DocumentParser>,
    handlers: Arc<HandlerRegistry>,
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    auth: Mutex<Value>,
    context: Mutex<Option<Value>>,
}

impl Subscriber {
    /// Create an empty subscriber.
    pub fn new(parser: Arc<dyn DocumentParser>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            parser,
            handlers,
            subscriptions: RwLock::new(HashMap::new()),
            auth: Mutex::new(Value::Null),
            context: Mutex::new(None),
        }
    }

    /// Store connection-level authorization state consumed by later
    /// subscribes.
    pub fn authorize(&self, auth: Value) {
        *self.auth.lock() = auth;
    }

    /// Register a subscription under `id`, replacing any previous entry
    /// with the same id.
    pub async fn subscribe(
        &self,
        id: SubscriptionId,
        query: &str,
        variables: Value,
    ) -> Result<(), SubscribeError> {
        let document = self
            .parser
            .parse(query)
            .map_err(|e| SubscribeError::InvalidQuery(vec![ErrorEntry::new(e.to_string())]))?;

        let validation_errors = self.parser.validate(&document);
        if !validation_errors.is_empty() {
            return Err(SubscribeError::InvalidQuery(
                validation_errors
                    .into_iter()
                    .map(|e| ErrorEntry::new(e.message))
                    .collect(),
            ));
        }

        let trigger = document
            .subscription_name()
            .map_err(|e| SubscribeError::InvalidQuery(vec![ErrorEntry::new(e.message)]))?
            .to_owned();

        let Some(handler) = self.handlers.lookup(&trigger) else {
            return Err(SubscribeError::InvalidQuery(vec![ErrorEntry::new(
                format!("unable to find subscription [{trigger}]"),
            )]));
        };

        let auth = self.auth.lock().clone();
        let context = self.context.lock().clone();

        if !handler
            .can_subscribe(&variables, &auth, context.as_ref())
            .await
        {
            return Err(SubscribeError::Unprocessable { trigger });
        }

        if context.is_none() {
            let Some(produced) = handler.on_subscribe(&variables, &auth).await else {
                return Err(SubscribeError::Unprocessable { trigger });
            };
            let mut slot = self.context.lock();
            if slot.is_none() {
                *slot = Some(produced);
            }
        }

        let subscription = Subscription {
            id: id.clone(),
            document,
            variables,
            trigger,
        };

        let replaced = self.subscriptions.write().insert(id, subscription);
        if replaced.is_none() {
            gauge!(SUBSCRIPTIONS_ACTIVE).increment(1.0);
        }
        Ok(())
    }

    /// Remove the subscription under `id`; no-op for unknown ids.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        if self.subscriptions.write().remove(id).is_some() {
            gauge!(SUBSCRIPTIONS_ACTIVE).decrement(1.0);
        }
    }

    /// Push `event` to every owned subscription whose trigger name matches
    /// and whose filter predicate accepts it.
    ///
    /// One subscription's execution failure never affects its siblings.
    pub async fn broadcast(&self, connection: &ClientConnection, event: &EventMessage) {
        let context = self.context.lock().clone().unwrap_or(Value::Null);

        let matching: Vec<Subscription> = {
            let subs = self.subscriptions.read();
            subs.values()
                .filter(|s| s.trigger == event.event)
                .cloned()
                .collect()
        };

        for sub in matching {
            let Some(handler) = self.handlers.lookup(&sub.trigger) else {
                warn!(
                    conn_id = %connection.id,
                    trigger = sub.trigger,
                    "no handler registered for stored subscription"
                );
                continue;
            };

            if !handler.filter(&sub.variables, &context) {
                continue;
            }

            match handler.execute(&sub.document, &context, &sub.variables).await {
                Ok(payload) => {
                    let frame = ServerFrame::SubscriptionData {
                        id: sub.id.clone(),
                        payload,
                    };
                    if connection.send_frame(&frame) {
                        counter!(BROADCAST_DELIVERIES_TOTAL).increment(1);
                    } else {
                        counter!(BROADCAST_DROPS_TOTAL).increment(1);
                        warn!(
                            conn_id = %connection.id,
                            sub_id = %sub.id,
                            "dropped data frame (outbound channel full or closed)"
                        );
                    }
                }
                Err(e) => {
                    counter!(EXECUTION_FAILURES_TOTAL).increment(1);
                    warn!(
                        conn_id = %connection.id,
                        sub_id = %sub.id,
                        trigger = sub.trigger,
                        error = %e,
                        "subscription execution failed, skipping push"
                    );
                }
            }
        }
        debug!(
            conn_id = %connection.id,
            trigger = event.event,
            "broadcast pass complete"
        );
    }

    /// Whether `id` is currently registered.
    pub fn has_subscription(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.read().contains_key(id)
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// (id, trigger) pairs for the diagnostics log.
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.subscriptions
            .read()
            .values()
            .map(|s| (s.id.to_string(), s.trigger.clone()))
            .collect()
    }
}
