//! Detector trait definition

use image::RgbImage;

use crate::domain::DomainError;

use super::entity::Detection;

/// Object detector over decoded RGB images
///
/// Implementations are CPU bound and synchronous; async callers run them on
/// the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send + Sync {
    /// Detect objects, returning boxes in `image` pixel coordinates
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DomainError>;

    /// Make sure the model is loaded and usable
    fn warm_up(&self) -> Result<(), DomainError>;
}
