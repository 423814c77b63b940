//! Health check endpoints for container probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
/// Used for basic liveness probes
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check with dependency verification
///
/// Unhealthy components answer `503`; a degraded service still takes jobs.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let checks = vec![
        check_detector(&state).await,
        check_storage(&state).await,
        check_result_api(&state),
        check_queue(&state),
    ];

    let overall_status = checks
        .iter()
        .map(|check| check.status)
        .fold(HealthStatus::Healthy, HealthStatus::worst);

    let latency = start.elapsed().as_millis() as u64;
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(latency),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
/// Used for Kubernetes liveness probes to detect crashes
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

impl HealthStatus {
    fn severity(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Degraded => 1,
            Self::Unhealthy => 2,
        }
    }

    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus, message: Option<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}

async fn check_detector(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let detector = state.detector.clone();

    // first call loads the model
    match tokio::task::spawn_blocking(move || detector.warm_up()).await {
        Ok(Ok(())) => HealthCheck::new("detector", HealthStatus::Healthy, None, start),
        Ok(Err(e)) => HealthCheck::new(
            "detector",
            HealthStatus::Unhealthy,
            Some(e.to_string()),
            start,
        ),
        Err(e) => HealthCheck::new(
            "detector",
            HealthStatus::Unhealthy,
            Some(format!("Model load task failed: {}", e)),
            start,
        ),
    }
}

async fn check_storage(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.storage.bucket_exists(None).await {
        Ok(true) => HealthCheck::new("storage", HealthStatus::Healthy, None, start),
        Ok(false) => HealthCheck::new(
            "storage",
            HealthStatus::Unhealthy,
            Some("Bucket does not exist".to_string()),
            start,
        ),
        Err(e) => HealthCheck::new(
            "storage",
            HealthStatus::Unhealthy,
            Some(e.to_string()),
            start,
        ),
    }
}

fn check_result_api(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    if state.reporter.is_configured() {
        HealthCheck::new("result_api", HealthStatus::Healthy, None, start)
    } else {
        HealthCheck::new(
            "result_api",
            HealthStatus::Degraded,
            Some("EXTERNAL_API_URL is not configured".to_string()),
            start,
        )
    }
}

fn check_queue(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    if state.queue.is_accepting() {
        HealthCheck::new("queue", HealthStatus::Healthy, None, start)
    } else {
        HealthCheck::new(
            "queue",
            HealthStatus::Unhealthy,
            Some("Queue is shut down".to_string()),
            start,
        )
    }
}
