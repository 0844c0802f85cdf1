//! Reconnecting connection manager.
//!
//! [`subscribe`] spawns one task that owns the transport, the reconnect timer
//! and the [`ChannelState`]. The task runs:
//!
//! ```text
//! Disconnected ─► Connecting ─► Connected ─► Disconnected ─(delay)─► Connecting ...
//!                     │                                              ▲
//!                     └──────── failure ─► Disconnected ─(delay)─────┘
//! ```
//!
//! There is never more than one transport or one pending timer.
//! [`ManagerHandle::reconnect_now`] cuts a pending delay short and
//! [`ManagerHandle::shutdown`] ends the task for good.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use herald_core::Event;
use herald_settings::ClientSettings;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::errors::{ClientError, Result};
use crate::state::ChannelState;
use crate::transport::{Connector, Frame, FrameStream};
use crate::url::channel_url;

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Silence after which an open transport is treated as closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Callback receiving each parsed event, in arrival order.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Manager configuration.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Channel endpoint URL (`ws://` or `wss://`).
    pub url: String,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Maximum silence on an open transport.
    pub idle_timeout: Duration,
}

impl ManagerConfig {
    /// Configuration for `url` with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Build from loaded settings, deriving the URL from the page origin.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Ok(Self {
            url: channel_url(&settings.page_origin)?,
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            idle_timeout: Duration::from_millis(settings.idle_timeout_ms.max(1)),
        })
    }
}

/// Start a manager task. Must be called inside a tokio runtime.
///
/// The returned handle is the only way to observe or stop the task; dropping
/// it cancels the task without waiting.
pub fn subscribe<C, F>(config: ManagerConfig, connector: C, on_event: F) -> ManagerHandle
where
    C: Connector + 'static,
    F: Fn(&Event) + Send + Sync + 'static,
{
    let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
    let reconnect = Arc::new(Notify::new());
    let cancel = CancellationToken::new();

    let worker = Worker {
        config,
        connector: Box::new(connector),
        on_event: Arc::new(on_event),
        state: state_tx,
        reconnect: reconnect.clone(),
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(worker.run());

    ManagerHandle {
        state: state_rx,
        reconnect,
        cancel,
        task: Some(task),
    }
}

/// Handle to a running manager.
pub struct ManagerHandle {
    state: watch::Receiver<ChannelState>,
    reconnect: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ManagerHandle {
    /// Whether a transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Receiver that observes state changes.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Skip the pending reconnect delay and attempt now.
    ///
    /// Ignored while an attempt is in flight or a transport is open.
    pub fn reconnect_now(&self) {
        self.reconnect.notify_one();
    }

    /// Stop the manager and wait for its task to finish.
    ///
    /// Once this returns no further state change or delivery happens.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "channel manager task failed");
            }
        }
    }
}

impl Drop for ManagerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Why an open transport stopped being used.
enum SessionEnd {
    Closed,
    Failed(ClientError),
    IdleTimeout,
    Cancelled,
}

struct Worker {
    config: ManagerConfig,
    connector: Box<dyn Connector>,
    on_event: EventCallback,
    state: watch::Sender<ChannelState>,
    reconnect: Arc<Notify>,
    cancel: CancellationToken,
}

impl Worker {
    #[instrument(skip_all, fields(url = %self.config.url))]
    async fn run(self) {
        loop {
            self.set_state(ChannelState::Connecting);
            let Some(opened) = self.open().await else {
                break;
            };

            match opened {
                Ok(frames) => {
                    self.set_state(ChannelState::Connected);
                    info!("channel connected");
                    match self.pump(frames).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Closed => info!("channel closed"),
                        SessionEnd::IdleTimeout => {
                            warn!(
                                idle_ms = self.config.idle_timeout.as_millis() as u64,
                                "channel idle, closing"
                            );
                        }
                        SessionEnd::Failed(e) => warn!(error = %e, "channel transport error"),
                    }
                }
                Err(e) => warn!(error = %e, "channel connection failed"),
            }

            self.set_state(ChannelState::Disconnected);
            if !self.wait_for_retry().await {
                break;
            }
        }
        self.set_state(ChannelState::Disconnected);
        debug!("channel manager stopped");
    }

    /// Open one transport. `None` when cancelled first.
    async fn open(&self) -> Option<Result<FrameStream>> {
        let connect = self.connector.connect(&self.config.url);
        tokio::pin!(connect);
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return None,
                result = &mut connect => return Some(result),
                () = self.reconnect.notified() => debug!("connection attempt already in flight"),
            }
        }
    }

    /// Deliver frames until the transport ends.
    async fn pump(&self, mut frames: FrameStream) -> SessionEnd {
        // Only inbound frames move the liveness deadline.
        let deadline = tokio::time::sleep(self.config.idle_timeout);
        tokio::pin!(deadline);

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return SessionEnd::Cancelled,
                () = &mut deadline => return SessionEnd::IdleTimeout,
                () = self.reconnect.notified() => {
                    debug!("already connected, reconnect request ignored");
                    continue;
                }
                next = frames.next() => next,
            };

            deadline
                .as_mut()
                .reset(tokio::time::Instant::now() + self.config.idle_timeout);
            match next {
                None | Some(Ok(Frame::Close)) => return SessionEnd::Closed,
                Some(Err(e)) => return SessionEnd::Failed(e),
                Some(Ok(Frame::Heartbeat)) => trace!("heartbeat"),
                Some(Ok(Frame::Text(text))) => self.deliver(&text),
            }
        }
    }

    fn deliver(&self, text: &str) {
        if self.cancel.is_cancelled() {
            return;
        }
        match Event::from_frame(text) {
            Ok(event) => {
                debug!(event_type = %event.event_type, "event received");
                (self.on_event)(&event);
            }
            Err(e) => warn!(error = %e, len = text.len(), "dropping malformed frame"),
        }
    }

    /// Sleep out the reconnect delay. `false` when cancelled first.
    async fn wait_for_retry(&self) -> bool {
        debug!(
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "reconnect scheduled"
        );
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = self.reconnect.notified() => {
                info!("reconnect requested");
                true
            }
            () = tokio::time::sleep(self.config.reconnect_delay) => true,
        }
    }

    fn set_state(&self, next: ChannelState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "channel state");
        }
    }
}
