//! Transport capability used by the connection manager.
//!
//! A [`Connector`] opens one transport and yields its inbound [`Frame`]s as a
//! stream. Dropping the stream closes the transport. [`WsConnector`] is the
//! production implementation over `tokio-tungstenite`.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::errors::{ClientError, Result};

/// One inbound unit from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Application payload, expected to be one JSON event.
    Text(String),
    /// Transport-level keepalive (ping or pong). Counts as activity only.
    Heartbeat,
    /// The peer closed the transport.
    Close,
}

/// Boxed stream of inbound frames returned by [`Connector::connect`].
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// Opens transports to the channel endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open one transport to `url`.
    async fn connect(&self, url: &str) -> Result<FrameStream>;
}

/// WebSocket transport.
///
/// Pings from the server are answered by `tungstenite` while the stream is
/// polled.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream> {
        let (ws, response) = connect_async(url).await?;
        debug!(url, status = %response.status(), "websocket handshake complete");
        Ok(Box::pin(ws.map(|msg| msg.map(to_frame).map_err(ClientError::from))))
    }
}

fn to_frame(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        // Undecodable bytes surface as a malformed event downstream.
        Message::Binary(bytes) => Frame::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Heartbeat,
        Message::Close(_) => Frame::Close,
    }
}
