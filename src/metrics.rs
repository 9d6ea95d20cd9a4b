// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("jobs_received_total", "Payloads popped from the work channel.");
        describe_counter!("jobs_malformed_total", "Payloads dropped as malformed.");
        describe_counter!("jobs_succeeded_total", "Jobs that reached Success.");
        describe_counter!("jobs_failed_total", "Jobs that exhausted all attempts.");
        describe_counter!("job_attempts_total", "Fetch-and-extract attempts made.");
        describe_counter!(
            "jobs_dead_lettered_total",
            "Payloads pushed to the failure channel."
        );
        describe_counter!(
            "consumer_loop_errors_total",
            "Errors and panics caught by the consumer loop."
        );
        describe_counter!(
            "store_conflicts_total",
            "Upserts skipped because the url belongs to another article."
        );
        describe_counter!(
            "notifications_failed_total",
            "Notifications that could not be delivered."
        );
        describe_histogram!("fetch_duration_ms", "Successful fetch time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register metric descriptions.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format, `/health` for probes.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            )
    }

    /// Serve [`Metrics::router`] on `addr` until `shutdown` fires.
    pub async fn serve(&self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics endpoint on {addr}"))?;
        tracing::info!(%addr, "metrics_endpoint_listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .context("metrics endpoint")?;
        Ok(())
    }
}
