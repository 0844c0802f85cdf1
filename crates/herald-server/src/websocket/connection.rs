//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use herald_core::ConnectionId;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The outbound queue is full; the peer is not draining it.
    #[error("send queue full")]
    Full,
    /// The writer task is gone; the socket is closed.
    #[error("send queue closed")]
    Closed,
}

/// Activity summary of a connection, logged when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Time since attach.
    pub age: Duration,
    /// Time since the last inbound frame, or since attach.
    pub idle: Duration,
    /// Frames that could not be queued.
    pub dropped_frames: u64,
}

/// One attached WebSocket client.
pub struct ClientConnection {
    id: ConnectionId,
    /// Send channel to the connection's WebSocket writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// Monotonic open time.
    connected_at: Instant,
    /// Wall-clock open time.
    opened_at: DateTime<Utc>,
    /// Whether any inbound activity happened since the last heartbeat check.
    is_alive: AtomicBool,
    last_activity: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection around a writer-task queue.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            opened_at: Utc::now(),
            is_alive: AtomicBool::new(true),
            last_activity: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Connection identifier.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Wall-clock time the connection was attached.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Queue a text frame without waiting.
    pub fn send(&self, message: Arc<String>) -> Result<(), SendError> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                match err {
                    mpsc::error::TrySendError::Full(_) => Err(SendError::Full),
                    mpsc::error::TrySendError::Closed(_) => Err(SendError::Closed),
                }
            }
        }
    }

    /// Total frames that could not be queued.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_activity.lock() = Instant::now();
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection showed activity since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last inbound activity (or attach).
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Current activity summary.
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            age: self.age(),
            idle: self.idle_for(),
            dropped_frames: self.drop_count(),
        }
    }
}
