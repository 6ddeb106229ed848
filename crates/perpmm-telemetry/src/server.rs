//! Minimal Prometheus text exporter.

use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use tracing::info;

use crate::error::{TelemetryError, TelemetryResult};

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Serve `/metrics` on the given port until the process exits.
pub async fn serve_metrics(port: u16) -> TelemetryResult<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TelemetryError::MetricsServer(format!("bind {addr}: {e}")))?;

    info!(addr = %addr, "Metrics exporter listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| TelemetryError::MetricsServer(e.to_string()))
}
