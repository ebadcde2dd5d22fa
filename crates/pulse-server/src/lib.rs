//! # pulse-server
//!
//! The subscription transport core: Axum WebSocket server, per-connection
//! subscription registry, wire-protocol dispatch, and pub/sub fan-out.
//!
//! - WebSocket gateway: connection lifecycle, frame dispatch, bounded
//!   outbound channels
//! - `ConnectionRegistry`: connection id → subscriber, the broadcast entry
//!   point invoked by the bridge
//! - `EventBridge`: shared-channel subscriber routing application events
//!   and keep-alive markers to every local connection
//! - Keep-alive timer publishing its marker through the shared channel so
//!   every process in the fleet pushes frames on the same tick
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod observer;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, PulseServer, ServerError};
pub use shutdown::ShutdownCoordinator;
