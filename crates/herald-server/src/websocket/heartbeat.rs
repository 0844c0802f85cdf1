//! Heartbeat liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use herald_core::ConnectionId;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::registry::ConnectionRegistry;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The connection left the registry (detached by a failed broadcast).
    Detached,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Number of consecutive silent intervals tolerated: `timeout / interval`,
/// at least 1.
pub fn max_missed(interval: Duration, timeout: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    (timeout.as_millis() / interval_ms).max(1) as u32
}

/// Watch a connection's liveness flag.
///
/// At each `interval` tick the registry's alive flag for `id` is probed and
/// reset. Each tick without inbound activity counts as a miss; reaching
/// [`max_missed`] consecutive misses returns [`HeartbeatResult::TimedOut`].
pub async fn run_heartbeat(
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    // The first tick completes immediately
    let _ = check_interval.tick().await;
    let max_missed = max_missed(interval, timeout);
    let mut missed: u32 = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
            _ = check_interval.tick() => {
                match registry.check_alive(&id) {
                    None => return HeartbeatResult::Detached,
                    Some(true) => missed = 0,
                    Some(false) => {
                        missed += 1;
                        if missed >= max_missed {
                            return HeartbeatResult::TimedOut;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn attached() -> (Arc<ConnectionRegistry>, ConnectionId, mpsc::Receiver<Arc<String>>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, rx) = mpsc::channel(8);
        let id = registry.attach(tx);
        (registry, id, rx)
    }

    #[test]
    fn max_missed_from_timeout_and_interval() {
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(90)), 3);
        assert_eq!(max_missed(Duration::from_secs(30), Duration::from_secs(10)), 1);
        assert_eq!(max_missed(Duration::ZERO, Duration::from_millis(5)), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let (registry, id, _rx) = attached();
        let result = run_heartbeat(
            registry,
            id,
            Duration::from_secs(30),
            Duration::from_secs(90),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_takes_max_missed_windows() {
        let (registry, id, _rx) = attached();
        let start = time::Instant::now();
        let _ = run_heartbeat(
            registry,
            id,
            Duration::from_secs(10),
            Duration::from_secs(30),
            CancellationToken::new(),
        )
        .await;
        // First probe consumes the initial alive flag, then three misses.
        assert_eq!(start.elapsed().as_secs(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn active_connection_stays_alive() {
        let (registry, id, _rx) = attached();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            registry.clone(),
            id.clone(),
            Duration::from_secs(10),
            Duration::from_secs(20),
            cancel.clone(),
        ));

        for _ in 0..10 {
            time::sleep(Duration::from_secs(5)).await;
            assert!(registry.touch(&id));
        }
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_connection_ends_heartbeat() {
        let (registry, id, _rx) = attached();
        let handle = tokio::spawn(run_heartbeat(
            registry.clone(),
            id.clone(),
            Duration::from_secs(10),
            Duration::from_secs(600),
            CancellationToken::new(),
        ));
        let _ = registry.detach(&id);
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Detached);
    }

    #[tokio::test]
    async fn cancel_before_first_probe() {
        let (registry, id, _rx) = attached();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_heartbeat(
            registry,
            id,
            Duration::from_secs(100),
            Duration::from_secs(300),
            cancel,
        )
        .await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }
}
