//! # pulse-pubsub
//!
//! The shared channel every server process relays events through.
//!
//! - [`PubSubBackend`] — the seam to the external broker. Production
//!   deployments implement it over their Redis/NATS client; the transport
//!   only publishes and subscribes.
//! - [`MemoryBackend`] — in-process implementation backed by
//!   `tokio::sync::broadcast`, used by tests and single-process
//!   deployments.
//! - [`EventPublisher`] — what application code calls to emit events into
//!   the fan-out path.

#![deny(unsafe_code)]

pub mod backend;
pub mod errors;
pub mod memory;
pub mod publisher;

pub use backend::PubSubBackend;
pub use errors::BackendError;
pub use memory::MemoryBackend;
pub use publisher::EventPublisher;
