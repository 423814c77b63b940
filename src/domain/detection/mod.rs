//! Detection domain - Bounding boxes, detections and the detector port

mod detector;
mod entity;

pub use detector::Detector;
pub use entity::{BoundingBox, Detection, ProcessedImage};

#[cfg(test)]
pub use detector::MockDetector;
