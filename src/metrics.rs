use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register series descriptions.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_series();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time series registration (so they show up on /metrics before first use).
fn describe_series() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_sessions_total", "Stream subscriptions opened.");
        describe_counter!(
            "feed_ticks_total",
            "Change-feed poll ticks across all connections."
        );
        describe_counter!("feed_updates_total", "Update batches pushed to subscribers.");
        describe_counter!("feed_records_total", "Incident records pushed in update batches.");
        describe_counter!(
            "feed_query_errors_total",
            "Store query failures swallowed by the poll loop."
        );
        describe_counter!("crises_ingested_total", "Incidents accepted via POST /crises.");
        describe_counter!(
            "stream_reconnects_total",
            "Viewer reconnect attempts after a stream failure."
        );
        describe_counter!(
            "stream_dropped_payloads_total",
            "Malformed update payloads dropped by the viewer."
        );
        describe_gauge!("viewer_buffer_size", "Incidents currently buffered by the viewer.");
        describe_counter!("cleanup_runs_total", "Retention sweeps executed.");
        describe_counter!("cleanup_deleted_total", "Incidents removed by retention cleanup.");
    });
}
