//! # herald-server
//!
//! Server half of the live notification channel.
//!
//! - `GET /ws`: WebSocket endpoint; each connection is attached to the
//!   [`ConnectionRegistry`](websocket::registry::ConnectionRegistry) for its lifetime
//! - [`Broadcaster`](websocket::broadcast::Broadcaster): fans one event out to a
//!   snapshot of the registry, detaching members whose send fails
//! - `POST /events`: ingest route for out-of-process event sources
//! - `GET /health`, `GET /metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use errors::{Result, ServerError};
