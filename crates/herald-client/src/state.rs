//! Client channel state.

use std::fmt;

/// Lifecycle of the client side of the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// No transport; a reconnect may be pending.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport is open and frames are being delivered.
    Connected,
}

impl ChannelState {
    /// Whether events can currently arrive.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Lowercase label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
