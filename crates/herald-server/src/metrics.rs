//! Prometheus metrics recorder and metric names.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::{Result, ServerError};

/// Admin sessions run from seconds to a working day.
const CONNECTION_DURATION_BUCKETS: &[f64] = &[
    1.0, 10.0, 60.0, 300.0, 1_800.0, 3_600.0, 14_400.0, 43_200.0,
];

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = builder()?.install_recorder()?;
    describe();
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(WS_CONNECTION_DURATION_SECONDS.to_owned()),
            CONNECTION_DURATION_BUCKETS,
        )
        .map_err(ServerError::from)
}

fn describe() {
    describe_counter!(WS_CONNECTIONS_TOTAL, "Channel connections opened");
    describe_counter!(WS_DISCONNECTIONS_TOTAL, "Channel connections closed, by reason");
    describe_gauge!(WS_CONNECTIONS_ACTIVE, "Channel connections currently attached");
    describe_counter!(
        WS_BROADCAST_DROPS_TOTAL,
        "Connections detached because a publish could not be enqueued"
    );
    describe_histogram!(
        WS_CONNECTION_DURATION_SECONDS,
        Unit::Seconds,
        "Lifetime of a channel connection"
    );
    describe_counter!(EVENTS_PUBLISHED_TOTAL, "Events published, by type");
}

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections detached because a broadcast send failed (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Events published (counter, labels: type).
pub const EVENTS_PUBLISHED_TOTAL: &str = "events_published_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_histogram_uses_buckets() {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::histogram!(WS_CONNECTION_DURATION_SECONDS).record(42.0);
        });
        let output = handle.render();
        assert!(output.contains("ws_connection_duration_seconds_bucket"));
    }

    #[test]
    fn metric_names_are_snake_case() {
        for name in [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_BROADCAST_DROPS_TOTAL,
            WS_CONNECTION_DURATION_SECONDS,
            EVENTS_PUBLISHED_TOTAL,
        ] {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
