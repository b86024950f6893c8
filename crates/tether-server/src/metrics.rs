//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Upgrades refused at the connection limit (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Connections closed for missing heartbeats (counter).
pub const WS_HEARTBEAT_TIMEOUTS_TOTAL: &str = "ws_heartbeat_timeouts_total";
/// Outbound frames dropped on a full or closed queue (counter).
pub const WS_SEND_DROPS_TOTAL: &str = "ws_send_drops_total";
/// Inbound frames dropped at decode (counter, labels: kind).
pub const WS_FRAMES_REJECTED_TOTAL: &str = "ws_frames_rejected_total";
/// Client events applied by the engine (counter, labels: event, outcome).
pub const RELAY_EVENTS_TOTAL: &str = "relay_events_total";
/// Server events handed to connection queues (counter).
pub const RELAY_DELIVERIES_TOTAL: &str = "relay_deliveries_total";
/// Rooms with at least one sender record (gauge).
pub const RELAY_ROOMS_ACTIVE: &str = "relay_rooms_active";
/// Sender records across all rooms (gauge).
pub const RELAY_RECORDS_ACTIVE: &str = "relay_records_active";
