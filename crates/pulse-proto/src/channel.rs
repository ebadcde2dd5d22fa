//! Messages exchanged over the shared pub/sub channel.
//!
//! Two shapes travel on the channel: application events published for
//! fan-out, `{"event": <trigger>, "data": <payload>}`, and the keep-alive
//! marker `{"type": "keepalive"}` published by whichever process owns the
//! keep-alive timer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;

/// An application event as published on the channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventMessage {
    /// Trigger name matched against registered subscriptions.
    pub event: String,
    /// Arbitrary payload; the transport never inspects it.
    #[serde(default)]
    pub data: Value,
}

/// A decoded channel message.
#[derive(Clone, Debug)]
pub enum ChannelMessage {
    /// Keep-alive marker: push a `keepalive` frame to every local connection.
    Keepalive,
    /// Application event: fan out to matching subscriptions.
    Event(EventMessage),
}

/// Internal decode shape. Untagged: the marker carries `type`, events carry
/// `event`; a message matching neither is a decode error.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawChannelMessage {
    Marker {
        r#type: String,
    },
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
}

impl ChannelMessage {
    /// Decode a raw channel payload.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let raw: RawChannelMessage =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        match raw {
            RawChannelMessage::Marker { r#type } if r#type == "keepalive" => Ok(Self::Keepalive),
            RawChannelMessage::Marker { r#type } => Err(DecodeError::UnknownMarker(r#type)),
            RawChannelMessage::Event { event, data } => {
                Ok(Self::Event(EventMessage { event, data }))
            }
        }
    }

    /// Encode the keep-alive marker.
    pub fn keepalive_marker() -> String {
        r#"{"type":"keepalive"}"#.to_owned()
    }
}

impl EventMessage {
    /// Build an event for a trigger name and payload.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Serialize for publication on the channel.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_keepalive_marker() {
        let msg = ChannelMessage::decode(r#"{"type":"keepalive"}"#).unwrap();
        assert!(matches!(msg, ChannelMessage::Keepalive));
    }

    #[test]
    fn decode_application_event() {
        let msg =
            ChannelMessage::decode(r#"{"event":"OnPostCreated","data":{"id":1,"title":"Hi"}}"#)
                .unwrap();
        match msg {
            ChannelMessage::Event(ev) => {
                assert_eq!(ev.event, "OnPostCreated");
                assert_eq!(ev.data["title"], "Hi");
            }
            ChannelMessage::Keepalive => panic!("expected event"),
        }
    }

    #[test]
    fn decode_event_without_data_defaults_to_null() {
        let msg = ChannelMessage::decode(r#"{"event":"Tick"}"#).unwrap();
        match msg {
            ChannelMessage::Event(ev) => {
                assert_eq!(ev.event, "Tick");
                assert!(ev.data.is_null());
            }
            ChannelMessage::Keepalive => panic!("expected event"),
        }
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(ChannelMessage::decode("{{{").is_err());
        assert!(ChannelMessage::decode(r#"{"unrelated":true}"#).is_err());
    }

    #[test]
    fn marker_roundtrip() {
        let text = ChannelMessage::keepalive_marker();
        let msg = ChannelMessage::decode(&text).unwrap();
        assert!(matches!(msg, ChannelMessage::Keepalive));
    }

    #[test]
    fn event_encode_shape() {
        let ev = EventMessage::new("OnPostCreated", json!({"id": 1}));
        let value: Value = serde_json::from_str(&ev.encode().unwrap()).unwrap();
        assert_eq!(value["event"], "OnPostCreated");
        assert_eq!(value["data"]["id"], 1);
    }

    #[test]
    fn unknown_marker_type_fails() {
        let err = ChannelMessage::decode(r#"{"type":"shutdown"}"#).unwrap_err();
        assert!(err.to_string().contains("shutdown"));
    }
}
