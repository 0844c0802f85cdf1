//! Event fan-out to connected WebSocket clients.

use std::sync::Arc;

use herald_core::Event;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use super::registry::ConnectionRegistry;
use crate::metrics::{EVENTS_PUBLISHED_TOTAL, WS_BROADCAST_DROPS_TOTAL};

/// Outcome of one publish pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections whose send failed and were detached.
    pub failed: usize,
}

/// Delivers published events to every attached connection.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster fans out over.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every connection attached at call time.
    ///
    /// The event is serialized once. Sends only enqueue onto each
    /// connection's bounded queue, so a slow peer costs one failed
    /// `try_send`, not a wait. A connection whose send fails is detached and
    /// the pass continues with the rest of the snapshot.
    pub fn publish(&self, event: &Event) -> PublishReport {
        let frame = match event.to_frame() {
            Ok(f) => Arc::new(f),
            Err(e) => {
                warn!(event_type = %event.event_type, error = %e, "failed to serialize event");
                return PublishReport::default();
            }
        };
        counter!(EVENTS_PUBLISHED_TOTAL, "type" => event.event_type.clone()).increment(1);

        let mut report = PublishReport::default();
        for conn in self.registry.snapshot() {
            match conn.send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(
                        conn_id = %conn.id(),
                        event_type = %event.event_type,
                        error = %e,
                        "send failed, detaching connection"
                    );
                    let _ = self.registry.detach(conn.id());
                }
            }
        }
        debug!(
            event_type = %event.event_type,
            delivered = report.delivered,
            failed = report.failed,
            "broadcast event"
        );
        report
    }
}
