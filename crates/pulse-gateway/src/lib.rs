//! # pulse-gateway
//!
//! The seam between the subscription transport and the GraphQL engine.
//!
//! The transport never parses, validates, or executes GraphQL itself. It
//! talks to two injection points:
//!
//! - [`DocumentParser`] — parse a subscription document and validate it
//!   against the deployment's schema.
//! - [`HandlerRegistry`] — trigger name → [`SubscriptionHandler`], the
//!   polymorphic handle exposing `can_subscribe` / `on_subscribe` /
//!   `filter` / `execute`. Populated at startup by the embedding
//!   application.

#![deny(unsafe_code)]

pub mod document;
pub mod errors;
pub mod handler;
pub mod registry;

pub use document::{Document, DocumentParser};
pub use errors::{GatewayError, ValidationError};
pub use handler::SubscriptionHandler;
pub use registry::HandlerRegistry;
