//! Detector loaded on first use

use std::sync::Arc;

use image::RgbImage;
use once_cell::sync::OnceCell;

use crate::config::ModelConfig;
use crate::domain::{Detection, Detector, DomainError};

use super::onnx::OnnxDetector;

/// Loads the ONNX model on the first detection
///
/// Load failures are returned to the caller and retried on the next call.
#[derive(Debug)]
pub struct LazyDetector {
    config: ModelConfig,
    inner: OnceCell<Arc<OnnxDetector>>,
}

impl LazyDetector {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    fn get(&self) -> Result<&Arc<OnnxDetector>, DomainError> {
        self.inner
            .get_or_try_init(|| OnnxDetector::load(&self.config).map(Arc::new))
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl Detector for LazyDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DomainError> {
        self.get()?.detect(image)
    }

    fn warm_up(&self) -> Result<(), DomainError> {
        self.get().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_not_cached() {
        let detector = LazyDetector::new(ModelConfig {
            path: "/nonexistent/model.onnx".to_string(),
            ..ModelConfig::default()
        });

        let image = RgbImage::new(8, 8);
        assert!(detector.detect(&image).is_err());
        assert!(!detector.is_loaded());

        let err = detector.warm_up().unwrap_err();
        assert!(err.to_string().contains("Detection model not found"));
        assert!(!detector.is_loaded());
    }
}
