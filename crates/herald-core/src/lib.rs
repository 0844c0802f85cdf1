//! # herald-core
//!
//! Shared vocabulary for the Herald notification channel.
//!
//! - [`events::Event`]: the `{type, data?, message?}` wire payload
//! - [`ids::ConnectionId`]: identity of one transport session
//! - [`logging`]: `tracing` subscriber setup used by every binary

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;

pub use events::Event;
pub use ids::ConnectionId;
