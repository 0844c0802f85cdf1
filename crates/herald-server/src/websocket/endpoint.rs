//! `/ws` endpoint: upgrade, attach, hold open, detach.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use herald_core::events::CONNECTION_ESTABLISHED;
use herald_core::{ConnectionId, Event};
use metrics::{counter, histogram};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::connection::ClientConnection;
use super::registry::{Attachment, ConnectionRegistry};
use crate::config::ServerConfig;
use crate::metrics::{WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::server::AppState;

/// How long the writer gets to flush a Close frame after the session ends.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why a channel session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelExit {
    /// Peer sent Close, the stream ended, or a read failed.
    PeerClosed,
    /// No inbound activity within the heartbeat timeout.
    HeartbeatTimeout,
    /// Detached from the registry by a failed broadcast.
    Detached,
    /// A write to the socket failed.
    WriteFailed,
    /// Server shutdown.
    Shutdown,
    /// The connection limit was reached between the upgrade check and attach.
    OverCapacity,
}

impl ChannelExit {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Detached => "detached",
            Self::WriteFailed => "write_failed",
            Self::Shutdown => "shutdown",
            Self::OverCapacity => "over_capacity",
        }
    }
}

enum WriterExit {
    Detached,
    Cancelled,
    WriteFailed,
}

/// GET /ws
///
/// The length check here only turns most excess upgrades into a plain 503.
/// The limit itself is enforced by the atomic attach in [`run_channel`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.registry.len() >= state.config.max_connections {
        warn!(
            max_connections = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }
    let registry = state.registry.clone();
    let config = state.config.clone();
    let session = state.shutdown.session_token();
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |socket| run_channel(socket, registry, config, session))
}

/// First frame sent on every new connection.
pub fn established_event(connection: &ClientConnection) -> Event {
    Event::new(CONNECTION_ESTABLISHED).with_data(json!({
        "connectionId": connection.id(),
        "connectedAt": connection.opened_at().to_rfc3339(),
    }))
}

/// Run one channel session from upgrade through disconnect.
///
/// The connection is attached before anything is written and detached
/// exactly once when this returns, whatever ended it. When the registry is
/// already full the socket is closed with code 1013 and nothing is attached.
#[instrument(skip_all, fields(conn_id))]
pub async fn run_channel(
    ws: WebSocket,
    registry: Arc<ConnectionRegistry>,
    config: Arc<ServerConfig>,
    session: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(config.send_queue_capacity.max(1));
    let Some(attachment) =
        Attachment::try_attach(registry.clone(), send_tx, config.max_connections)
    else {
        warn!(
            max_connections = config.max_connections,
            "connection limit reached after upgrade, closing"
        );
        let _ = ws_tx.send(over_capacity_close()).await;
        counter!(WS_DISCONNECTIONS_TOTAL, "reason" => ChannelExit::OverCapacity.as_str())
            .increment(1);
        return;
    };
    let id = attachment.id().clone();
    let _ = tracing::Span::current().record("conn_id", id.as_str());

    info!("channel connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);

    let hello_sent = match established_event(attachment.connection()).to_frame() {
        Ok(frame) => ws_tx.send(Message::Text(frame.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to serialize connection.established");
            true
        }
    };

    let exit = if hello_sent {
        let mut writer = tokio::spawn(write_loop(
            ws_tx,
            send_rx,
            config.heartbeat_interval(),
            session.clone(),
        ));
        let heartbeat = run_heartbeat(
            registry.clone(),
            id.clone(),
            config.heartbeat_interval(),
            config.heartbeat_timeout(),
            session.clone(),
        );
        let reader = read_loop(&mut ws_rx, &registry, &id);

        let mut writer_done = false;
        let exit = tokio::select! {
            () = reader => ChannelExit::PeerClosed,
            result = heartbeat => match result {
                HeartbeatResult::TimedOut => ChannelExit::HeartbeatTimeout,
                HeartbeatResult::Detached => ChannelExit::Detached,
                HeartbeatResult::Cancelled => ChannelExit::Shutdown,
            },
            result = &mut writer => {
                writer_done = true;
                match result {
                    Ok(WriterExit::Detached) => ChannelExit::Detached,
                    Ok(WriterExit::Cancelled) => ChannelExit::Shutdown,
                    Ok(WriterExit::WriteFailed) | Err(_) => ChannelExit::WriteFailed,
                }
            }
        };

        session.cancel();
        if !writer_done && tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
            writer.abort();
        }
        exit
    } else {
        ChannelExit::WriteFailed
    };

    let stats = attachment.connection().stats();
    drop(attachment);
    info!(
        reason = exit.as_str(),
        age_ms = stats.age.as_millis() as u64,
        idle_ms = stats.idle.as_millis() as u64,
        dropped_frames = stats.dropped_frames,
        "channel disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => exit.as_str()).increment(1);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(stats.age.as_secs_f64());
}

/// Close frame for a socket refused because the registry is full.
fn over_capacity_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AGAIN,
        reason: String::from("connection limit reached").into(),
    }))
}

/// Drain inbound frames. Application messages are not interpreted; every
/// frame only refreshes liveness.
async fn read_loop(
    ws_rx: &mut SplitStream<WebSocket>,
    registry: &ConnectionRegistry,
    id: &ConnectionId,
) {
    while let Some(Ok(msg)) = ws_rx.next().await {
        if let Message::Close(_) = msg {
            debug!("peer sent close frame");
            break;
        }
        let _ = registry.touch(id);
    }
}

/// Forward queued frames to the socket and emit periodic Ping frames.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut send_rx: mpsc::Receiver<Arc<String>>,
    ping_every: Duration,
    cancel: CancellationToken,
) -> WriterExit {
    let mut ping_interval = tokio::time::interval(ping_every);
    // Skip the immediate first tick
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return WriterExit::Cancelled;
            }
            msg = send_rx.recv() => match msg {
                Some(text) => {
                    if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                        return WriterExit::WriteFailed;
                    }
                }
                // Every sender is gone: the registry no longer holds us.
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return WriterExit::Detached;
                }
            },
            _ = ping_interval.tick() => {
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return WriterExit::WriteFailed;
                }
            }
        }
    }
}
