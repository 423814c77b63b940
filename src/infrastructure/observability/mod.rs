//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use self::metrics::{
    PrometheusMetrics, create_metrics_router, init_metrics, record_job, record_report_failure,
    set_queue_depth,
};
