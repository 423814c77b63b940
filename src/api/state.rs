//! Application state for shared services

use std::sync::Arc;

use crate::domain::{BlobStorage, Detector, ResultReporter};
use crate::infrastructure::queue::QueueProcessor;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<QueueProcessor>,
    pub detector: Arc<dyn Detector>,
    pub storage: Arc<dyn BlobStorage>,
    pub reporter: Arc<dyn ResultReporter>,
}

impl AppState {
    pub fn new(
        queue: Arc<QueueProcessor>,
        detector: Arc<dyn Detector>,
        storage: Arc<dyn BlobStorage>,
        reporter: Arc<dyn ResultReporter>,
    ) -> Self {
        Self {
            queue,
            detector,
            storage,
            reporter,
        }
    }
}
