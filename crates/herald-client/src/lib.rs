//! # herald-client
//!
//! Client half of the live notification channel.
//!
//! - [`subscribe`] spawns a [`manager`] task that keeps one connection open,
//!   reconnecting on a fixed delay, and hands every parsed [`Event`] to a
//!   callback
//! - [`alert::AlertDispatcher`] turns selected events into a tone and a
//!   visual [`alert::Alert`]
//! - [`channel_url`] derives the endpoint URL from the admin page origin
//!
//! [`Event`]: herald_core::Event

#![deny(unsafe_code)]

pub mod alert;
pub mod errors;
pub mod manager;
pub mod state;
pub mod transport;
pub mod url;

pub use errors::{ClientError, Result, SoundError};
pub use manager::{ManagerConfig, ManagerHandle, subscribe};
pub use state::ChannelState;
pub use transport::{Connector, Frame, FrameStream, WsConnector};
pub use url::channel_url;
