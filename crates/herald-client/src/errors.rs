//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors from the channel client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The page origin has no `http`/`https` scheme.
    #[error("invalid page origin {origin:?}: expected http:// or https://")]
    InvalidOrigin {
        /// The rejected origin.
        origin: String,
    },

    /// WebSocket handshake or transport failure.
    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from a [`SoundBackend`](crate::alert::SoundBackend).
///
/// These are logged by the dispatcher and never reach the user.
#[derive(Debug, Error)]
pub enum SoundError {
    /// No player command configured.
    #[error("player command is empty")]
    EmptyCommand,

    /// The player process could not be started.
    #[error("failed to start player {program:?}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The output device is unavailable.
    #[error("sound unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origin_display() {
        let err = ClientError::InvalidOrigin {
            origin: "ftp://x".into(),
        };
        assert!(err.to_string().contains("ftp://x"));
    }

    #[test]
    fn tungstenite_error_converts() {
        let err: ClientError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, ClientError::WebSocket(_)));
    }

    #[test]
    fn spawn_error_names_program() {
        let err = SoundError::Spawn {
            program: "aplay".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("aplay"));
    }
}
