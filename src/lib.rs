//! Detecção de Criadouro detection service
//!
//! Accepts image URLs over HTTP, runs a YOLO model over each image in a
//! background queue and reports the annotated result to the results API:
//! - Blob storage on Google Cloud Storage (downloads from `gs://` or `http(s)`)
//! - ONNX Runtime inference with letterboxing and NMS
//! - Bounded-concurrency job queue with graceful drain

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::{BlobStorage, Detector, ResultReporter};
use infrastructure::{
    blob::LazyBlobStorage,
    detection::{ImageAnnotator, LazyDetector},
    queue::{JobPipeline, QueueProcessor},
    result::HttpResultReporter,
};
use tracing::{info, warn};

/// Build the application state and start the queue processor
///
/// Storage and the model are created on first use, so missing credentials
/// or model files show up as failed jobs and in `/ready`, not here.
pub fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let detector: Arc<dyn Detector> = Arc::new(LazyDetector::new(config.model.clone()));
    let storage: Arc<dyn BlobStorage> = Arc::new(LazyBlobStorage::new(config.storage.clone()));
    let reporter: Arc<dyn ResultReporter> =
        Arc::new(HttpResultReporter::new(&config.external_api)?);

    if !reporter.is_configured() {
        warn!("EXTERNAL_API_URL is not configured, result updates will fail");
    }

    let annotator = Arc::new(ImageAnnotator::from_config(
        detector.clone(),
        &config.model,
    ));
    let pipeline = JobPipeline::new(
        storage.clone(),
        annotator,
        reporter.clone(),
        config.storage.processed_prefix.clone(),
    );
    let queue = Arc::new(QueueProcessor::start(pipeline, &config.queue));

    info!(
        bucket = %config.storage.bucket,
        model = %config.model.path,
        max_workers = config.queue.max_workers,
        "Application state initialized"
    );

    Ok(AppState::new(queue, detector, storage, reporter))
}

#[cfg(test)]
mod tests {
    use crate::config::DEFAULT_FONT_PATH;

    const DOCKERFILE: &str = include_str!("../Dockerfile");

    fn runtime_stage() -> &'static str {
        DOCKERFILE
            .rsplit_once("\nFROM ")
            .map(|(_, stage)| stage)
            .unwrap()
    }

    #[test]
    fn test_image_builds_from_locked_dependencies() {
        assert!(DOCKERFILE.contains("COPY Cargo.toml Cargo.lock ./"));
        assert!(DOCKERFILE.contains("cargo build --release --locked"));
    }

    #[test]
    fn test_runtime_image_ships_label_font() {
        let runtime = runtime_stage();

        assert!(runtime.contains("fonts-dejavu-core"));
        assert!(DEFAULT_FONT_PATH.starts_with("/usr/share/fonts/truetype/dejavu/"));
    }

    #[test]
    fn test_runtime_image_serves_on_8080() {
        let runtime = runtime_stage();

        assert!(runtime.contains("EXPOSE 8080"));
        assert!(runtime.contains("COPY detection_model/ ./detection_model/"));
        assert!(runtime.contains(r#""serve", "--host", "0.0.0.0", "--port", "8080""#));
    }
}
