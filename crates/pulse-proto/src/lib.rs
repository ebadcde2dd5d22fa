//! # pulse-proto
//!
//! Wire protocol for the subscription transport.
//!
//! - Client/server JSON frames (`init`, `subscription_start`, `subscription_data`, ...)
//! - `SubscriptionId` — client-chosen token, echoed back verbatim
//! - Pub/sub channel messages: application events and the keep-alive marker
//! - Client-facing error payloads (`{errors: [{message}]}`)

#![deny(unsafe_code)]

pub mod channel;
pub mod errors;
pub mod frames;

pub use channel::{ChannelMessage, EventMessage};
pub use errors::{DecodeError, ErrorEntry, ErrorPayload, SubscribeError};
pub use frames::{ClientFrame, ServerFrame, SubscriptionId};
