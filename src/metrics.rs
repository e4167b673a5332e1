//! Request and relay counters.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners.
//! Nothing is recorded anywhere unless a recorder is installed, which
//! [`install_exporter`] does when `METRICS_PORT` is configured.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// Count one finished request for `endpoint` with its response status.
pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "tubeproxy_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record handler latency measured from `start`.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("tubeproxy_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    counter!("tubeproxy_upstream_errors_total").increment(1);
}

pub fn record_relayed_bytes(bytes: usize) {
    counter!("tubeproxy_relayed_bytes_total").increment(bytes as u64);
}

pub fn record_playlist_rewrite() {
    counter!("tubeproxy_playlists_rewritten_total").increment(1);
}

/// Install the Prometheus recorder and serve `/metrics` on `port`.
///
/// Must be called from inside the tokio runtime.
pub fn install_exporter(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Prometheus exporter listening on http://{}/metrics", addr);
    Ok(())
}
