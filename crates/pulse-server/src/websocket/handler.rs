//! Inbound frame dispatch.
//!
//! One function, one frame: parse the text as a `ClientFrame` and produce a
//! [`Disposition`] for the session loop to act on. Subscribe failures turn
//! into `subscription_fail` replies; frames that cannot be decoded at all
//! close the connection.

use std::sync::Arc;

use metrics::counter;
use pulse_proto::frames::{ClientFrame, ServerFrame};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::connection::ClientConnection;
use super::registry::ConnectionRegistry;
use super::subscriber::Subscriber;
use crate::metrics::SUBSCRIBE_FAILURES_TOTAL;

/// Everything a dispatched frame may need.
pub struct DispatchContext {
    /// The connection the frame arrived on.
    pub connection: Arc<ClientConnection>,
    /// Its subscriber.
    pub subscriber: Arc<Subscriber>,
    /// The registry, for operations that fan out beyond this connection.
    pub registry: Arc<ConnectionRegistry>,
}

/// What the session loop should do with the handled frame.
#[derive(Debug)]
pub enum Disposition {
    /// Send this frame back.
    Reply(ServerFrame),
    /// Nothing to send.
    Silent,
    /// Close the connection (malformed frame or unrecognized type).
    Close,
}

/// Handle one inbound message.
#[instrument(skip_all, fields(conn_id = %ctx.connection.id))]
pub async fn handle_frame(text: &str, ctx: &DispatchContext) -> Disposition {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "undecodable frame, closing connection");
            return Disposition::Close;
        }
    };

    match frame {
        ClientFrame::Init => {
            debug!("handshake");
            Disposition::Reply(ServerFrame::InitSuccess)
        }

        ClientFrame::SubscriptionStart {
            id,
            query,
            variables,
            operation_name: _,
        } => {
            let variables = variables.unwrap_or(Value::Null);
            match ctx.subscriber.subscribe(id.clone(), &query, variables).await {
                Ok(()) => {
                    debug!(sub_id = %id, "subscription registered");
                    Disposition::Reply(ServerFrame::SubscriptionSuccess { id })
                }
                Err(e) => {
                    counter!(SUBSCRIBE_FAILURES_TOTAL, "reason" => match &e {
                        pulse_proto::SubscribeError::InvalidQuery(_) => "invalid_query",
                        pulse_proto::SubscribeError::Unprocessable { .. } => "denied",
                    })
                    .increment(1);
                    warn!(sub_id = %id, error = %e, "subscription rejected");
                    Disposition::Reply(ServerFrame::SubscriptionFail {
                        id,
                        payload: e.to_payload(),
                    })
                }
            }
        }

        ClientFrame::SubscriptionEnd { id } => {
            ctx.subscriber.unsubscribe(&id);
            debug!(sub_id = %id, "subscription ended");
            Disposition::Silent
        }

        ClientFrame::KeepAlive => {
            ctx.registry.keepalive_all().await;
            Disposition::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulse_gateway::{
        Document, DocumentParser, GatewayError, HandlerRegistry, SubscriptionHandler,
        ValidationError,
    };
    use serde_json::json;
    use tokio::sync::mpsc;

    struct TestParser;

    impl DocumentParser for TestParser {
        fn parse(&self, text: &str) -> Result<Document, GatewayError> {
            let name = text
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .trim_matches('{');
            Ok(Document::new(text, vec![name.to_owned()]))
        }

        fn validate(&self, document: &Document) -> Vec<ValidationError> {
            if document.text().contains("unknownField") {
                vec![ValidationError::new("unknown field `unknownField`")]
            } else {
                vec![]
            }
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl SubscriptionHandler for EchoHandler {
        async fn execute(
            &self,
            _document: &Document,
            _context: &Value,
            _variables: &Value,
        ) -> Result<Value, GatewayError> {
            Ok(json!({"ok": true}))
        }
    }

    fn make_ctx() -> (DispatchContext, mpsc::Receiver<String>) {
        let mut handlers = HandlerRegistry::new();
        handlers.register("OnPost", EchoHandler);
        let parser: Arc<dyn DocumentParser> = Arc::new(TestParser);
        let handlers = Arc::new(handlers);
        let registry = Arc::new(ConnectionRegistry::new(parser.clone(), handlers.clone()));

        let (tx, rx) = mpsc::channel(32);
        let connection = Arc::new(ClientConnection::new("c1".into(), tx));
        let subscriber = Arc::new(Subscriber::new(parser, handlers));
        (
            DispatchContext {
                connection,
                subscriber,
                registry,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn init_yields_init_success() {
        let (ctx, _rx) = make_ctx();
        let disposition = handle_frame(r#"{"type":"init"}"#, &ctx).await;
        match disposition {
            Disposition::Reply(ServerFrame::InitSuccess) => {}
            other => panic!("expected init_success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_subscription_start_succeeds() {
        let (ctx, _rx) = make_ctx();
        let text = r#"{"type":"subscription_start","id":1,"query":"subscription OnPost { x }"}"#;
        let disposition = handle_frame(text, &ctx).await;
        match disposition {
            Disposition::Reply(ServerFrame::SubscriptionSuccess { id }) => {
                assert_eq!(id.to_string(), "1");
            }
            other => panic!("expected subscription_success, got {other:?}"),
        }
        assert_eq!(ctx.subscriber.subscription_count(), 1);
    }

    #[tokio::test]
    async fn invalid_subscription_start_fails_with_errors() {
        let (ctx, _rx) = make_ctx();
        let text = r#"{"type":"subscription_start","id":1,"query":"subscription OnPost { unknownField }"}"#;
        let disposition = handle_frame(text, &ctx).await;
        match disposition {
            Disposition::Reply(ServerFrame::SubscriptionFail { id, payload }) => {
                assert_eq!(id.to_string(), "1");
                assert!(!payload.errors.is_empty());
            }
            other => panic!("expected subscription_fail, got {other:?}"),
        }
        assert_eq!(ctx.subscriber.subscription_count(), 0);
    }

    #[tokio::test]
    async fn subscription_end_is_silent() {
        let (ctx, _rx) = make_ctx();
        let start = r#"{"type":"subscription_start","id":1,"query":"subscription OnPost { x }"}"#;
        let _ = handle_frame(start, &ctx).await;

        let end = r#"{"type":"subscription_end","id":1}"#;
        let disposition = handle_frame(end, &ctx).await;
        assert!(matches!(disposition, Disposition::Silent));
        assert_eq!(ctx.subscriber.subscription_count(), 0);
    }

    #[tokio::test]
    async fn subscription_end_for_unknown_id_is_silent() {
        let (ctx, _rx) = make_ctx();
        let disposition = handle_frame(r#"{"type":"subscription_end","id":9}"#, &ctx).await;
        assert!(matches!(disposition, Disposition::Silent));
    }

    #[tokio::test]
    async fn malformed_json_closes() {
        let (ctx, _rx) = make_ctx();
        let disposition = handle_frame("not json", &ctx).await;
        assert!(matches!(disposition, Disposition::Close));
    }

    #[tokio::test]
    async fn unrecognized_type_closes() {
        let (ctx, _rx) = make_ctx();
        let disposition = handle_frame(r#"{"type":"mystery"}"#, &ctx).await;
        assert!(matches!(disposition, Disposition::Close));
    }

    #[tokio::test]
    async fn keep_alive_pushes_to_attached_connections() {
        let (ctx, _rx) = make_ctx();
        // Attach a connection through the registry so the fan-out has a
        // recipient.
        let (tx, mut attached_rx) = mpsc::channel(32);
        let attached = Arc::new(ClientConnection::new("c2".into(), tx));
        let _ = ctx.registry.attach(attached).await;

        let disposition = handle_frame(r#"{"type":"keep_alive"}"#, &ctx).await;
        assert!(matches!(disposition, Disposition::Silent));

        let frame: Value = serde_json::from_str(&attached_rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "keepalive");
    }
}
