//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;
use crate::domain::ResultStatus;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("detection_service_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at /metrics");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record the outcome of one processed job
pub fn record_job(status: ResultStatus, duration: Duration, detected: u64) {
    let labels = [("status", status.as_str().to_string())];

    counter!("detection_jobs_total", &labels).increment(1);
    histogram!("detection_job_duration_seconds", &labels).record(duration.as_secs_f64());

    if detected > 0 {
        counter!("detection_objects_detected_total").increment(detected);
    }
}

/// Record a failed call to the results API
pub fn record_report_failure(status: ResultStatus) {
    counter!("detection_report_failures_total", "status" => status.as_str()).increment(1);
}

/// Track jobs waiting in the queue
pub fn set_queue_depth(pending: u64) {
    gauge!("detection_queue_pending").set(pending as f64);
}
